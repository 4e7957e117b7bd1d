//! Utility functions shared across the timetable builder and clearing engine.

use crate::types::MarketDimensions;

/// Fixed-point rounding helpers (SPEC_FULL.md §3, §9: "no floating-point in
/// the settlement path. Midpoint rounding is half-to-even").
pub mod rounding {
    /// `round(numerator / denominator)` with ties rounded to the nearest
    /// even quotient. `denominator` must be strictly positive.
    pub fn half_to_even(numerator: i64, denominator: i64) -> i64 {
        debug_assert!(denominator > 0, "rounding denominator must be positive");
        let quotient = numerator.div_euclid(denominator);
        let remainder = numerator.rem_euclid(denominator);
        let twice = remainder * 2;
        match twice.cmp(&denominator) {
            std::cmp::Ordering::Less => quotient,
            std::cmp::Ordering::Greater => quotient + 1,
            std::cmp::Ordering::Equal => {
                if quotient % 2 == 0 {
                    quotient
                } else {
                    quotient + 1
                }
            }
        }
    }
}

/// Deterministic seeding for the tie-breaking shuffle of §4.3: the seed is
/// derived from `(region, market, name, timestep)` so repeated runs over the
/// same inputs produce the same match ordering.
pub mod seed {
    use super::MarketDimensions;
    use crate::types::Timestamp;
    use std::hash::{Hash, Hasher};

    pub fn for_step(dims: &MarketDimensions, timestep: Timestamp) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        dims.hash(&mut hasher);
        timestep.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
        hasher.finish()
    }
}

/// Logging utilities, matching the facade used throughout the engine.
pub mod logging {
    /// Initialises the `env_logger` backend for the `log` facade. Safe to
    /// call more than once; subsequent calls are no-ops.
    pub fn init() {
        let _ = env_logger::Builder::from_default_env()
            .format_timestamp_micros()
            .try_init();
    }
}

/// Fixture builders used by the test suite.
#[cfg(test)]
pub mod testing {
    use crate::types::*;
    use chrono::{TimeZone, Utc};

    pub fn ts(seconds: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    pub fn dims() -> MarketDimensions {
        MarketDimensions::new("bavaria", "lem", "pda_uniform")
    }

    pub fn bid(agent: &str, energy_in: Energy, price_pu_in: PricePerUnit, timestep: Timestamp) -> Quote {
        Quote {
            timestamp: timestep,
            timestep,
            id_agent: agent.to_string(),
            energy_type: None,
            energy_in,
            energy_out: 0,
            price_pu_in,
            price_pu_out: 0,
        }
    }

    pub fn offer(agent: &str, energy_out: Energy, price_pu_out: PricePerUnit, timestep: Timestamp) -> Quote {
        Quote {
            timestamp: timestep,
            timestep,
            id_agent: agent.to_string(),
            energy_type: None,
            energy_in: 0,
            energy_out,
            price_pu_in: 0,
            price_pu_out,
        }
    }

    pub fn retailer_quote(dims: &MarketDimensions, timestep: Timestamp, retailer: &str) -> RetailerQuote {
        RetailerQuote {
            timestamp: timestep,
            dimensions: dims.clone(),
            retailer: retailer.to_string(),
            energy_price_sell: 0,
            energy_price_buy: 0,
            energy_quantity_sell: 0,
            energy_quantity_buy: 0,
            balancing_price_sell: 6,
            balancing_price_buy: 12,
            grid_local_sell: 1,
            grid_local_buy: 1,
            grid_retail_sell: 2,
            grid_retail_buy: 2,
            levies_price_sell: 1,
            levies_price_buy: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::rounding::half_to_even;

    #[test]
    fn half_to_even_rounds_ties_to_nearest_even() {
        assert_eq!(half_to_even(17, 2), 8); // 8.5 -> 8
        assert_eq!(half_to_even(19, 2), 10); // 9.5 -> 10
        assert_eq!(half_to_even(18, 2), 9); // exact
        assert_eq!(half_to_even(-7, 2), -4); // -3.5 -> -4 (even)
    }

    #[test]
    fn half_to_even_handles_non_tie_cases() {
        assert_eq!(half_to_even(10, 4), 2); // 2.5 -> 2 (nearest even)
        assert_eq!(half_to_even(9, 4), 2); // 2.25 -> 2
        assert_eq!(half_to_even(11, 4), 3); // 2.75 -> 3
    }
}
