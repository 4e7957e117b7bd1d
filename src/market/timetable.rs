//! Timetable Builder (TB) — SPEC_FULL.md §4.1.
//!
//! Pure expansion of a market's declarative clearing/timing configuration
//! into a flat, time-sorted sequence of action rows.

use chrono::Duration;

use crate::config::{ClearingConfig, MarketConfig, TimingConfig};
use crate::error::ClearingError;
use crate::types::{ActionSet, ClearingMethod, ClearingType, Coupling, MarketDimensions, Pricing, Settling, Timestamp};

/// One row of the timetable (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableRow {
    pub timestamp: Timestamp,
    pub timestep: Timestamp,
    pub dimensions: MarketDimensions,
    pub action: ActionSet,
    pub clearing_type: ClearingType,
    pub method: ClearingMethod,
    pub pricing: Pricing,
    pub coupling: Coupling,
}

/// Builds the timetable for a single market instance.
pub struct TimetableBuilder;

impl TimetableBuilder {
    /// Expands `config` from `simulation_start` until `simulation_start +
    /// simulation_duration`. Only `clearing.type = ex-ante` is fully
    /// specified; `ex-post` is a defined stub (SPEC_FULL.md §9) that yields
    /// a single `clear` row per opening with no rolling horizon.
    pub fn build(
        config: &MarketConfig,
        simulation_start: Timestamp,
        simulation_duration: Duration,
    ) -> Result<Vec<TimetableRow>, ClearingError> {
        let clearing = &config.clearing;
        Self::validate(clearing)?;

        let dims = MarketDimensions::new(&config.region, &config.market, &config.name);
        let end = simulation_start + simulation_duration;

        let mut rows = match clearing.clearing_type {
            ClearingType::ExAnte => Self::build_ex_ante(&dims, clearing, simulation_start, end)?,
            ClearingType::ExPost => Vec::new(), // defined stub: identity, no rows generated yet.
        };

        rows.sort_by(|a, b| (a.timestamp, a.timestep).cmp(&(b.timestamp, b.timestep)));
        Ok(rows)
    }

    fn validate(clearing: &ClearingConfig) -> Result<(), ClearingError> {
        let timing = &clearing.timing;
        if timing.frequency > timing.opening {
            return Err(ClearingError::Configuration {
                message: format!(
                    "frequency ({}) must not exceed opening ({})",
                    timing.frequency, timing.opening
                ),
            });
        }
        if timing.frequency <= 0 || timing.opening <= 0 || timing.duration <= 0 {
            return Err(ClearingError::Configuration {
                message: "frequency, opening and duration must be strictly positive".to_string(),
            });
        }
        if timing.horizon.0 > timing.horizon.1 {
            return Err(ClearingError::Configuration {
                message: format!("horizon start {} must not exceed horizon end {}", timing.horizon.0, timing.horizon.1),
            });
        }
        Ok(())
    }

    fn build_ex_ante(
        dims: &MarketDimensions,
        clearing: &ClearingConfig,
        simulation_start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<TimetableRow>, ClearingError> {
        let timing = &clearing.timing;
        let mut rows = Vec::new();

        let mut opening = timing.start.resolve(simulation_start);
        while opening < end {
            Self::build_opening(dims, clearing, timing, opening, &mut rows);
            opening = opening + Duration::seconds(timing.opening);
        }

        Ok(rows)
    }

    fn build_opening(
        dims: &MarketDimensions,
        clearing: &ClearingConfig,
        timing: &TimingConfig,
        opening: Timestamp,
        rows: &mut Vec<TimetableRow>,
    ) {
        let opening_end = if timing.frequency == timing.opening {
            opening + Duration::seconds(timing.opening)
        } else {
            opening + Duration::seconds(timing.horizon.1)
        };

        let mut frequency_instant = opening;
        while frequency_instant < opening_end {
            Self::build_frequency_block(dims, clearing, timing, opening, frequency_instant, rows);
            frequency_instant = frequency_instant + Duration::seconds(timing.frequency);
        }
    }

    fn build_frequency_block(
        dims: &MarketDimensions,
        clearing: &ClearingConfig,
        timing: &TimingConfig,
        opening: Timestamp,
        frequency_instant: Timestamp,
        rows: &mut Vec<TimetableRow>,
    ) {
        let horizon_start = opening + Duration::seconds(timing.horizon.0);
        let horizon_end = opening + Duration::seconds(timing.horizon.1);
        let start_step = horizon_start.max(frequency_instant);

        let mut block = Vec::new();
        let mut step = start_step;
        while step < horizon_end {
            block.push((step, ActionSet::clear_only()));
            step = step + Duration::seconds(timing.duration);
        }

        Self::apply_settling(timing, frequency_instant, &mut block);

        for (timestep, action) in block {
            rows.push(TimetableRow {
                timestamp: frequency_instant,
                timestep,
                dimensions: dims.clone(),
                action,
                clearing_type: clearing.clearing_type,
                method: clearing.method,
                pricing: clearing.pricing,
                coupling: clearing.coupling.clone(),
            });
        }
    }

    /// Settling adjustment (SPEC_FULL.md §4.1).
    fn apply_settling(timing: &TimingConfig, frequency_instant: Timestamp, block: &mut [(Timestamp, ActionSet)]) {
        let closing = Duration::seconds(timing.closing);

        match timing.settling {
            Settling::Continuous => {
                for (timestep, action) in block.iter_mut() {
                    if *timestep <= frequency_instant {
                        action.settle = true;
                    }
                    if *timestep - frequency_instant < closing {
                        *action = ActionSet::settle_only();
                    }
                }
            }
            Settling::Periodic => {
                let any_due_to_settle = block.iter().any(|(timestep, _)| *timestep <= frequency_instant + closing);
                if any_due_to_settle {
                    for (_, action) in block.iter_mut() {
                        action.settle = true;
                    }
                }
                let any_past_closing = block.iter().any(|(timestep, _)| *timestep - frequency_instant < closing);
                if any_past_closing {
                    for (_, action) in block.iter_mut() {
                        *action = ActionSet::settle_only();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Start, TimingConfig};
    use crate::types::{ClearingMethod, ClearingType, Pricing, Settling};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn make_config(timing: TimingConfig) -> MarketConfig {
        MarketConfig {
            region: "bavaria".into(),
            market: "lem".into(),
            name: "pda_uniform".into(),
            clearing: ClearingConfig {
                clearing_type: ClearingType::ExAnte,
                method: ClearingMethod::Pda,
                pricing: Pricing::Uniform,
                coupling: Coupling::None,
                timing,
            },
            retailers: HashMap::new(),
        }
    }

    fn sim_start() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_frequency_greater_than_opening() {
        let timing = TimingConfig {
            start: Start::OffsetSeconds(0),
            opening: 900,
            frequency: 1800,
            duration: 900,
            horizon: (0, 900),
            closing: 0,
            settling: Settling::Continuous,
        };
        let config = make_config(timing);
        let err = TimetableBuilder::build(&config, sim_start(), Duration::seconds(3600)).unwrap_err();
        assert!(matches!(err, ClearingError::Configuration { .. }));
    }

    #[test]
    fn single_shot_auction_emits_one_row_per_opening() {
        let timing = TimingConfig {
            start: Start::OffsetSeconds(0),
            opening: 3600,
            frequency: 3600,
            duration: 3600,
            horizon: (0, 3600),
            closing: 0,
            settling: Settling::Continuous,
        };
        let config = make_config(timing);
        let rows = TimetableBuilder::build(&config, sim_start(), Duration::hours(4)).unwrap();
        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert_eq!(row.timestamp, row.timestep);
        }
    }

    #[test]
    fn rolling_horizon_action_transitions_continuous() {
        // opening=3600, frequency=900, horizon=[0,3600], duration=900, closing=1800
        let timing = TimingConfig {
            start: Start::OffsetSeconds(0),
            opening: 3600,
            frequency: 900,
            duration: 900,
            horizon: (0, 3600),
            closing: 1800,
            settling: Settling::Continuous,
        };
        let config = make_config(timing);
        let rows = TimetableBuilder::build(&config, sim_start(), Duration::hours(1)).unwrap();

        // First frequency block (F = opening): steps at 0,900,1800,2700 relative.
        // step(T=0): T-F=0 < closing(1800) -> settle only.
        let first_block: Vec<_> = rows.iter().filter(|r| r.timestamp == sim_start()).collect();
        assert_eq!(first_block.len(), 4);
        assert_eq!(first_block[0].action, ActionSet::settle_only());
        // step(T=900): T<=F(0)? no. T-F=900 < 1800 -> settle only too.
        assert_eq!(first_block[1].action, ActionSet::settle_only());
        // step(T=1800): T-F=1800, not < 1800 -> stays clear (T<=F false).
        assert_eq!(first_block[2].action, ActionSet::clear_only());
        // step(T=2700): clear only.
        assert_eq!(first_block[3].action, ActionSet::clear_only());
    }

    #[test]
    fn stable_sort_is_idempotent() {
        let timing = TimingConfig {
            start: Start::OffsetSeconds(0),
            opening: 1800,
            frequency: 900,
            duration: 900,
            horizon: (0, 1800),
            closing: 900,
            settling: Settling::Periodic,
        };
        let config = make_config(timing);
        let a = TimetableBuilder::build(&config, sim_start(), Duration::hours(2)).unwrap();
        let b = TimetableBuilder::build(&config, sim_start(), Duration::hours(2)).unwrap();
        assert_eq!(a, b);
    }
}
