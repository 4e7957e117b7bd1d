//! The five result tables a timetable row produces (SPEC_FULL.md §3, §4.11).

use crate::types::{ClearedBid, ClearedOffer, Transaction, UnclearedBid, UnclearedOffer};

/// The local, per-row builder for the five result tables. Reset at the start
/// of `execute` (SPEC_FULL.md §4.11 step 2) and written back to the market
/// database at the end of the row (step 5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub bids_cleared: Vec<ClearedBid>,
    pub offers_cleared: Vec<ClearedOffer>,
    pub bids_uncleared: Vec<UnclearedBid>,
    pub offers_uncleared: Vec<UnclearedOffer>,
    pub transactions: Vec<Transaction>,
}

impl StepOutput {
    pub fn is_empty(&self) -> bool {
        self.bids_cleared.is_empty()
            && self.offers_cleared.is_empty()
            && self.bids_uncleared.is_empty()
            && self.offers_uncleared.is_empty()
            && self.transactions.is_empty()
    }
}
