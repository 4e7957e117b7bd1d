//! Coupling hook (SPEC_FULL.md §4.10, §9): re-posting residuals to an
//! adjacent market. `above`/`below` are defined stubs — identity, guarded by
//! cycle detection.

use std::collections::HashSet;

use crate::error::{ClearingError, RowContext};
use crate::types::{Coupling, MarketName, UnclearedBid, UnclearedOffer};

/// Tracks markets already visited along the current row's coupling chain, to
/// reject re-entrant coupling cycles (SPEC_FULL.md §9).
pub struct CouplingContext<'a> {
    known_markets: &'a HashSet<MarketName>,
    visited: HashSet<MarketName>,
}

impl<'a> CouplingContext<'a> {
    /// `self_name` seeds the visited set so a market coupling directly back
    /// to itself is caught on the first hop.
    pub fn new(known_markets: &'a HashSet<MarketName>, self_name: &MarketName) -> Self {
        let mut visited = HashSet::new();
        visited.insert(self_name.clone());
        Self { known_markets, visited }
    }

    /// Applies `coupling` to a row's residual uncleared bids/offers. `None`
    /// is identity. `Above`/`Below` validate the neighbour exists and has not
    /// already been visited on this chain, then forward the residuals
    /// unchanged (the defined stub of SPEC_FULL.md §9).
    pub fn apply(
        &mut self,
        coupling: &Coupling,
        context: &RowContext,
        bids: Vec<UnclearedBid>,
        offers: Vec<UnclearedOffer>,
    ) -> Result<(Vec<UnclearedBid>, Vec<UnclearedOffer>), ClearingError> {
        let neighbour = match coupling {
            Coupling::None => return Ok((bids, offers)),
            Coupling::Above(n) | Coupling::Below(n) => n,
        };

        if !self.known_markets.contains(neighbour) {
            return Err(ClearingError::UnknownNeighbour {
                context: context.clone(),
                neighbour: neighbour.clone(),
            });
        }
        if !self.visited.insert(neighbour.clone()) {
            return Err(ClearingError::CouplingCycle {
                context: context.clone(),
                neighbour: neighbour.clone(),
            });
        }

        log::debug!("coupling would forward {} bids / {} offers to {neighbour:?}", bids.len(), offers.len());
        Ok((bids, offers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::ts;

    fn ctx() -> RowContext {
        RowContext::new(&crate::utils::testing::dims(), ts(0), ts(0), "settle")
    }

    #[test]
    fn none_is_identity() {
        let known = HashSet::new();
        let mut cc = CouplingContext::new(&known, &"pda_uniform".to_string());
        let (bids, offers) = cc.apply(&Coupling::None, &ctx(), vec![], vec![]).unwrap();
        assert!(bids.is_empty() && offers.is_empty());
    }

    #[test]
    fn unknown_neighbour_is_rejected() {
        let known = HashSet::new();
        let mut cc = CouplingContext::new(&known, &"pda_uniform".to_string());
        let err = cc.apply(&Coupling::Above("neighbour".into()), &ctx(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, ClearingError::UnknownNeighbour { .. }));
    }

    #[test]
    fn coupling_back_into_self_is_a_cycle() {
        let mut known = HashSet::new();
        known.insert("pda_uniform".to_string());
        let mut cc = CouplingContext::new(&known, &"pda_uniform".to_string());
        let err = cc.apply(&Coupling::Below("pda_uniform".into()), &ctx(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, ClearingError::CouplingCycle { .. }));
    }

    #[test]
    fn revisiting_a_neighbour_twice_is_a_cycle() {
        let mut known = HashSet::new();
        known.insert("pda_uniform".to_string());
        known.insert("neighbour".to_string());
        let mut cc = CouplingContext::new(&known, &"pda_uniform".to_string());
        cc.apply(&Coupling::Above("neighbour".into()), &ctx(), vec![], vec![]).unwrap();
        let err = cc.apply(&Coupling::Above("neighbour".into()), &ctx(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, ClearingError::CouplingCycle { .. }));
    }
}
