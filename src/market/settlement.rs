//! Settlement: balancing energy (SPEC_FULL.md §4.8) and grid fees/levies
//! (SPEC_FULL.md §4.9).

use crate::types::{Energy, Money, PricePerUnit, RetailerQuote, Transaction, TransactionType, UnclearedBid, UnclearedOffer};

/// Per-row energy cap applied before the balancing price multiplication
/// (SPEC_FULL.md §9): keeps `price_in`/`price_out` inside the signed-64-bit
/// transaction price column even for pathological residuals.
const BALANCING_ENERGY_CAP: Energy = 1_000_000;

/// Caps `energy` at [`BALANCING_ENERGY_CAP`], logging the clamp for `agent`
/// at `warn` level (SPEC_FULL.md §10.1) when it actually fires.
fn capped(agent: &str, energy: Energy) -> Energy {
    if energy > BALANCING_ENERGY_CAP {
        log::warn!(
            "balancing energy for agent {agent:?} capped from {energy} to {BALANCING_ENERGY_CAP} to keep the price product in range"
        );
        BALANCING_ENERGY_CAP
    } else {
        energy
    }
}

/// Builds the balancing transactions for a timestep's residual uncleared
/// bids/offers against a single retailer row. `ordinal_start` is the next
/// free ordinal within the timestep's transactions table.
pub fn balancing_transactions(
    bids: &[UnclearedBid],
    offers: &[UnclearedOffer],
    retailer: &RetailerQuote,
    ordinal_start: u32,
) -> Vec<Transaction> {
    let mut ordinal = ordinal_start;
    let mut out = Vec::with_capacity(bids.len() + offers.len());

    for bid in bids {
        let energy_in = capped(&bid.id_agent_in, bid.energy_in);
        let price_pu_in = retailer.balancing_price_buy;
        out.push(Transaction {
            timestep: bid.timestep,
            id_agent: bid.id_agent_in.clone(),
            ordinal,
            type_transaction: TransactionType::Balancing,
            energy_in,
            energy_out: 0,
            price_pu_in,
            price_pu_out: 0,
            price_in: price_pu_in as Money * energy_in as Money,
            price_out: 0,
            quality: 0,
        });
        ordinal += 1;
    }

    for offer in offers {
        let energy_out = capped(&offer.id_agent_out, offer.energy_out);
        let price_pu_out = retailer.balancing_price_sell;
        out.push(Transaction {
            timestep: offer.timestep,
            id_agent: offer.id_agent_out.clone(),
            ordinal,
            type_transaction: TransactionType::Balancing,
            energy_in: 0,
            energy_out,
            price_pu_in: 0,
            price_pu_out,
            price_in: 0,
            price_out: price_pu_out as Money * energy_out as Money,
            quality: 0,
        });
        ordinal += 1;
    }

    out
}

fn retagged(source: &Transaction, type_transaction: TransactionType, rate_in: PricePerUnit, rate_out: PricePerUnit, ordinal: u32) -> Transaction {
    let price_pu_in = if source.energy_in > 0 { rate_in } else { 0 };
    let price_pu_out = if source.energy_out > 0 { rate_out } else { 0 };
    Transaction {
        timestep: source.timestep,
        id_agent: source.id_agent.clone(),
        ordinal,
        type_transaction,
        energy_in: source.energy_in,
        energy_out: source.energy_out,
        price_pu_in,
        price_pu_out,
        price_in: price_pu_in as Money * source.energy_in as Money,
        price_out: price_pu_out as Money * source.energy_out as Money,
        quality: 0,
    }
}

/// Clones the step's transactions table twice: once re-priced at the
/// retailer's grid rate, once at its levies rate (SPEC_FULL.md §4.9).
/// `transactions` is the step's table *as accumulated so far* (market rows
/// from a same-row clear, plus any balancing rows just emitted).
pub fn grid_and_levies_transactions(transactions: &[Transaction], retailer: &RetailerQuote, ordinal_start: u32) -> Vec<Transaction> {
    let mut ordinal = ordinal_start;
    let mut out = Vec::with_capacity(transactions.len() * 2);

    for source in transactions {
        out.push(retagged(source, TransactionType::Grid, retailer.grid_local_buy, retailer.grid_local_sell, ordinal));
        ordinal += 1;
    }
    for source in transactions {
        out.push(retagged(
            source,
            TransactionType::Levies,
            retailer.levies_price_buy,
            retailer.levies_price_sell,
            ordinal,
        ));
        ordinal += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{dims, retailer_quote, ts};

    #[test]
    fn offer_residual_sells_balancing_at_retailer_sell_rate() {
        let t = ts(0);
        let retailer = retailer_quote(&dims(), t, "main");
        let offers = vec![UnclearedOffer {
            timestep: t,
            id_agent_out: "seller".into(),
            energy_type: None,
            energy_out: 3,
        }];
        let txs = balancing_transactions(&[], &offers, &retailer, 0);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].type_transaction, TransactionType::Balancing);
        assert_eq!(txs[0].price_pu_out, retailer.balancing_price_sell);
        assert_eq!(txs[0].price_out, retailer.balancing_price_sell as Money * 3);
    }

    #[test]
    fn balancing_energy_above_cap_is_clamped() {
        let t = ts(0);
        let retailer = retailer_quote(&dims(), t, "main");
        let bids = vec![UnclearedBid {
            timestep: t,
            id_agent_in: "short".into(),
            energy_type: None,
            energy_in: BALANCING_ENERGY_CAP + 500,
        }];
        let txs = balancing_transactions(&bids, &[], &retailer, 0);
        assert_eq!(txs[0].energy_in, BALANCING_ENERGY_CAP);
    }

    #[test]
    fn grid_and_levies_double_the_table_and_retag() {
        let t = ts(0);
        let retailer = retailer_quote(&dims(), t, "main");
        let source = vec![Transaction {
            timestep: t,
            id_agent: "a".into(),
            ordinal: 0,
            type_transaction: TransactionType::Market,
            energy_in: 5,
            energy_out: 0,
            price_pu_in: 10,
            price_pu_out: 0,
            price_in: 50,
            price_out: 0,
            quality: 0,
        }];
        let extra = grid_and_levies_transactions(&source, &retailer, 1);
        assert_eq!(extra.len(), 2);
        assert_eq!(extra[0].type_transaction, TransactionType::Grid);
        assert_eq!(extra[0].price_pu_in, retailer.grid_local_buy);
        assert_eq!(extra[1].type_transaction, TransactionType::Levies);
        assert_eq!(extra[1].price_pu_in, retailer.levies_price_buy);
    }
}
