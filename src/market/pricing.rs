//! Pricing policy (SPEC_FULL.md §4.5).

use crate::market::book::JoinedRow;
use crate::types::{Pricing, PricePerUnit};
use crate::utils::rounding::half_to_even;

/// Computes the clearing price-per-unit for every cleared row, according to
/// the configured [`Pricing`] policy. `cleared` must already be filtered to
/// `JoinedRow::is_cleared() == true` rows, in merge order.
pub fn price_cleared_rows(pricing: Pricing, cleared: &[JoinedRow]) -> Vec<PricePerUnit> {
    match pricing {
        Pricing::Uniform => price_uniform(cleared),
        Pricing::Discriminatory => price_discriminatory(cleared),
    }
}

/// Pay-as-clear: every cleared row settles at the marginal (last) pair's
/// midpoint price.
fn price_uniform(cleared: &[JoinedRow]) -> Vec<PricePerUnit> {
    let Some(marginal) = cleared.last() else {
        return Vec::new();
    };
    let price = half_to_even(marginal.price_pu_in as i64 + marginal.price_pu_out as i64, 2) as PricePerUnit;
    vec![price; cleared.len()]
}

/// Pay-as-bid: every cleared row settles at its own midpoint price.
fn price_discriminatory(cleared: &[JoinedRow]) -> Vec<PricePerUnit> {
    cleared
        .iter()
        .map(|row| half_to_even(row.price_pu_in as i64 + row.price_pu_out as i64, 2) as PricePerUnit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(price_pu_in: PricePerUnit, price_pu_out: PricePerUnit) -> JoinedRow {
        JoinedRow {
            energy_cumsum: 1,
            id_agent_in: "in".to_string(),
            price_pu_in,
            raw_energy_in: 1,
            id_agent_out: "out".to_string(),
            price_pu_out,
            raw_energy_out: 1,
        }
    }

    #[test]
    fn uniform_applies_marginal_pair_to_every_row() {
        let cleared = vec![row(10, 7), row(9, 8)];
        let prices = price_cleared_rows(Pricing::Uniform, &cleared);
        // marginal pair = last row (9,8) -> round((9+8)/2) = round(8.5) = 8 (nearest even)
        assert_eq!(prices, vec![8, 8]);
    }

    #[test]
    fn discriminatory_uses_each_rows_own_midpoint() {
        let cleared = vec![row(10, 8), row(9, 7)];
        let prices = price_cleared_rows(Pricing::Discriminatory, &cleared);
        assert_eq!(prices, vec![9, 8]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(price_cleared_rows(Pricing::Uniform, &[]).is_empty());
        assert!(price_cleared_rows(Pricing::Discriminatory, &[]).is_empty());
    }
}
