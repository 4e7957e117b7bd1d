//! Retailer book assembly, order-book split, and cumulative-energy merge
//! (SPEC_FULL.md §4.2-§4.4).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::types::{AgentId, BidRow, Energy, MarketDimensions, OfferRow, PricePerUnit, Quote, RetailerQuote, Timestamp};
use crate::utils::seed;

/// Projects a retailer quote into the quote schema (SPEC_FULL.md §4.2): the
/// rename table `retailer -> id_agent`, `energy_price_sell ->
/// price_pu_in`, etc. `energy_type` is always `None` until the upstream
/// retailer table carries it.
pub fn retailer_quote_as_quote(retailer: &RetailerQuote) -> Quote {
    Quote {
        timestamp: retailer.timestamp,
        timestep: retailer.timestamp,
        id_agent: retailer.retailer.clone(),
        energy_type: None,
        energy_in: retailer.energy_quantity_sell,
        energy_out: retailer.energy_quantity_buy,
        price_pu_in: retailer.energy_price_sell,
        price_pu_out: retailer.energy_price_buy,
    }
}

/// Aligns agent quotes and retailer quotes (projected via
/// [`retailer_quote_as_quote`]) into a single combined book for a step.
pub fn assemble_book(agent_quotes: &[Quote], retailer_quotes: &[RetailerQuote]) -> Vec<Quote> {
    let mut book: Vec<Quote> = agent_quotes.to_vec();
    book.extend(retailer_quotes.iter().map(retailer_quote_as_quote));
    book
}

/// The order-book split of SPEC_FULL.md §4.3: separates bids/offers, shuffles
/// with a seed derived from `(region, market, name, timestep)` to break ties
/// fairly and reproducibly, stable-sorts by price, and appends the running
/// cumulative energy.
pub fn split_book(book: &[Quote], dims: &MarketDimensions, timestep: Timestamp) -> (Vec<BidRow>, Vec<OfferRow>) {
    let mut bids: Vec<Quote> = book.iter().filter(|q| q.energy_in > 0).cloned().collect();
    let mut offers: Vec<Quote> = book.iter().filter(|q| q.energy_out > 0).cloned().collect();

    let seed = seed::for_step(dims, timestep);
    let mut rng = StdRng::seed_from_u64(seed);
    bids.shuffle(&mut rng);
    offers.shuffle(&mut rng);

    // Stable sort preserves the shuffle's tie-breaking order among equal prices.
    bids.sort_by(|a, b| b.price_pu_in.cmp(&a.price_pu_in));
    offers.sort_by(|a, b| a.price_pu_out.cmp(&b.price_pu_out));

    let mut bid_cumsum: Energy = 0;
    let bid_rows: Vec<BidRow> = bids
        .into_iter()
        .map(|q| {
            bid_cumsum += q.energy_in;
            BidRow {
                timestep: q.timestep,
                id_agent_in: q.id_agent,
                energy_type: q.energy_type,
                energy_in: q.energy_in,
                price_pu_in: q.price_pu_in,
                energy_cumsum: bid_cumsum,
            }
        })
        .collect();

    let mut offer_cumsum: Energy = 0;
    let offer_rows: Vec<OfferRow> = offers
        .into_iter()
        .map(|q| {
            offer_cumsum += q.energy_out;
            OfferRow {
                timestep: q.timestep,
                id_agent_out: q.id_agent,
                energy_type: q.energy_type,
                energy_out: q.energy_out,
                price_pu_out: q.price_pu_out,
                energy_cumsum: offer_cumsum,
            }
        })
        .collect();

    (bid_rows, offer_rows)
}

/// One row of the cumulative-energy full-outer-join merge of SPEC_FULL.md
/// §4.4: the bid and offer active at cumulative-energy threshold
/// `energy_cumsum`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub energy_cumsum: Energy,
    pub id_agent_in: AgentId,
    pub price_pu_in: PricePerUnit,
    pub raw_energy_in: Energy,
    pub id_agent_out: AgentId,
    pub price_pu_out: PricePerUnit,
    pub raw_energy_out: Energy,
}

impl JoinedRow {
    pub fn is_cleared(&self) -> bool {
        self.price_pu_in >= self.price_pu_out
    }

    /// `energy = min(energy_in, energy_out)` at this threshold (SPEC_FULL.md §4.4).
    pub fn matched_energy(&self) -> Energy {
        self.raw_energy_in.min(self.raw_energy_out)
    }
}

/// Merges sorted, cumsum-annotated bids and offers by cumulative energy.
///
/// Equivalent to a full-outer-join on `energy_cumsum` followed by a
/// backward-fill of nulls (SPEC_FULL.md §4.4): at each union breakpoint,
/// whichever bid/offer row is still "in force" (its own cumulative energy
/// has not yet been exceeded) is the active one. Breakpoints beyond
/// `min(total_bid_energy, total_offer_energy)` have one side unfilled (no
/// further rows on that side) — such rows can never satisfy the cleared or
/// uncleared price comparison and are not emitted, matching the observable
/// behaviour of a join whose nulls cannot be backward-filled past the end of
/// either column.
pub fn merge_cumulative(bids: &[BidRow], offers: &[OfferRow]) -> Vec<JoinedRow> {
    let mut rows = Vec::new();
    if bids.is_empty() || offers.is_empty() {
        return rows;
    }

    let total_bid = bids.last().map(|b| b.energy_cumsum).unwrap_or(0);
    let total_offer = offers.last().map(|o| o.energy_cumsum).unwrap_or(0);
    let cap = total_bid.min(total_offer);

    let mut i = 0usize;
    let mut j = 0usize;
    while i < bids.len() && j < offers.len() {
        let bid = &bids[i];
        let offer = &offers[j];
        let threshold = bid.energy_cumsum.min(offer.energy_cumsum);
        if threshold > cap {
            break;
        }

        rows.push(JoinedRow {
            energy_cumsum: threshold,
            id_agent_in: bid.id_agent_in.clone(),
            price_pu_in: bid.price_pu_in,
            raw_energy_in: bid.energy_in,
            id_agent_out: offer.id_agent_out.clone(),
            price_pu_out: offer.price_pu_out,
            raw_energy_out: offer.energy_out,
        });

        if bid.energy_cumsum <= offer.energy_cumsum {
            i += 1;
        }
        if offer.energy_cumsum <= bid.energy_cumsum {
            j += 1;
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{bid, dims, offer, ts};

    #[test]
    fn split_separates_bids_and_offers_with_cumsum() {
        let t = ts(0);
        let book = vec![bid("a1", 5, 10, t), offer("a2", 5, 8, t)];
        let (bids, offers) = split_book(&book, &dims(), t);
        assert_eq!(bids.len(), 1);
        assert_eq!(offers.len(), 1);
        assert_eq!(bids[0].energy_cumsum, 5);
        assert_eq!(offers[0].energy_cumsum, 5);
    }

    #[test]
    fn sort_orders_bids_descending_and_offers_ascending() {
        let t = ts(0);
        let book = vec![
            bid("low", 1, 5, t),
            bid("high", 1, 10, t),
            offer("cheap", 1, 3, t),
            offer("pricey", 1, 9, t),
        ];
        let (bids, offers) = split_book(&book, &dims(), t);
        assert_eq!(bids[0].id_agent_in, "high");
        assert_eq!(bids[1].id_agent_in, "low");
        assert_eq!(offers[0].id_agent_out, "cheap");
        assert_eq!(offers[1].id_agent_out, "pricey");
    }

    #[test]
    fn merge_produces_single_row_for_trivial_match() {
        let t = ts(0);
        let book = vec![bid("buyer", 5, 10, t), offer("seller", 5, 8, t)];
        let (bids, offers) = split_book(&book, &dims(), t);
        let joined = merge_cumulative(&bids, &offers);
        assert_eq!(joined.len(), 1);
        assert!(joined[0].is_cleared());
        assert_eq!(joined[0].matched_energy(), 5);
    }

    #[test]
    fn merge_stops_at_the_smaller_side_total() {
        let t = ts(0);
        let book = vec![bid("buyer", 5, 10, t), offer("seller", 8, 8, t)];
        let (bids, offers) = split_book(&book, &dims(), t);
        let joined = merge_cumulative(&bids, &offers);
        // Only one breakpoint (5) is within both sides' cumulative range (cap=5).
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].matched_energy(), 5);
    }

    #[test]
    fn no_overlap_produces_uncleared_row() {
        let t = ts(0);
        let book = vec![bid("buyer", 5, 5, t), offer("seller", 5, 9, t)];
        let (bids, offers) = split_book(&book, &dims(), t);
        let joined = merge_cumulative(&bids, &offers);
        assert_eq!(joined.len(), 1);
        assert!(!joined[0].is_cleared());
    }
}
