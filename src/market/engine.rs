//! The clearing engine: executes a single timetable row end to end
//! (SPEC_FULL.md §4.11).

use std::collections::{HashMap, HashSet};

use crate::error::{ClearingError, RowContext};
use crate::market::book::{assemble_book, merge_cumulative, split_book};
use crate::market::coupling::CouplingContext;
use crate::market::data_source::MarketDataSource;
use crate::market::pricing::price_cleared_rows;
use crate::market::settlement::{balancing_transactions, grid_and_levies_transactions};
use crate::market::tables::StepOutput;
use crate::market::timetable::TimetableRow;
use crate::types::{Action, AgentId, ClearedBid, ClearedOffer, Energy, MarketName, Money, RetailerQuote, Transaction, TransactionType, UnclearedBid, UnclearedOffer};

/// Orchestrates the clearing pipeline against a [`MarketDataSource`] for one
/// market instance (SPEC_FULL.md §5: single-threaded cooperative per
/// instance, exclusive access to its own tables and quote slice).
pub struct ClearingEngine<D> {
    data_source: D,
}

impl<D: MarketDataSource> ClearingEngine<D> {
    pub fn new(data_source: D) -> Self {
        Self { data_source }
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    /// Executes one timetable row: dispatches its actions in order, runs the
    /// coupling hook, and commits the five local tables (SPEC_FULL.md §4.11).
    pub async fn execute_row(&self, row: &TimetableRow, known_markets: &HashSet<MarketName>) -> Result<StepOutput, ClearingError> {
        let retailer_quotes = self.data_source.fetch_retailer_quotes(&row.dimensions, row.timestep).await?;
        let mut output = StepOutput::default();

        for action in row.action.ordered() {
            match action {
                Action::Clear => self.do_clear(row, &retailer_quotes, &mut output).await?,
                Action::Settle => self.do_settle(row, &retailer_quotes, &mut output).await?,
            }
        }

        let context = RowContext::new(&row.dimensions, row.timestamp, row.timestep, row.action.as_str());
        let mut coupling_ctx = CouplingContext::new(known_markets, &row.dimensions.name);
        let (bids_uncleared, offers_uncleared) = coupling_ctx.apply(
            &row.coupling,
            &context,
            std::mem::take(&mut output.bids_uncleared),
            std::mem::take(&mut output.offers_uncleared),
        )?;
        output.bids_uncleared = bids_uncleared;
        output.offers_uncleared = offers_uncleared;

        log::info!(
            "cleared row region={} market={} name={} timestamp={} timestep={} action={} bids_cleared={} offers_cleared={} bids_uncleared={} offers_uncleared={} transactions={}",
            row.dimensions.region,
            row.dimensions.market,
            row.dimensions.name,
            row.timestamp,
            row.timestep,
            row.action,
            output.bids_cleared.len(),
            output.offers_cleared.len(),
            output.bids_uncleared.len(),
            output.offers_uncleared.len(),
            output.transactions.len(),
        );

        self.data_source.commit_step(&row.dimensions, row.timestep, output.clone()).await?;
        Ok(output)
    }

    /// `clear` action (SPEC_FULL.md §4.2-§4.7).
    async fn do_clear(&self, row: &TimetableRow, retailer_quotes: &[RetailerQuote], output: &mut StepOutput) -> Result<(), ClearingError> {
        let quotes = self.data_source.fetch_quotes(&row.dimensions, row.timestep).await?;
        let book = assemble_book(&quotes, retailer_quotes);
        if book.is_empty() {
            return Ok(()); // empty-book fast path (SPEC_FULL.md §7), not an error.
        }

        let (bids, offers) = split_book(&book, &row.dimensions, row.timestep);
        let joined = merge_cumulative(&bids, &offers);
        let cleared: Vec<_> = joined.into_iter().filter(|r| r.is_cleared()).collect();
        let prices = price_cleared_rows(row.pricing, &cleared);

        let retailer_ids: HashSet<&str> = retailer_quotes.iter().map(|r| r.retailer.as_str()).collect();
        let mut cleared_in: HashMap<AgentId, Energy> = HashMap::new();
        let mut cleared_out: HashMap<AgentId, Energy> = HashMap::new();

        for (ordinal, (joined_row, price_pu)) in cleared.iter().zip(prices).enumerate() {
            let ordinal = ordinal as u32;
            let energy = joined_row.matched_energy();
            let price: Money = price_pu as Money * energy as Money;

            output.bids_cleared.push(ClearedBid {
                timestep: row.timestep,
                id_agent_in: joined_row.id_agent_in.clone(),
                trade_ordinal: ordinal,
                energy_in: energy,
                price_pu_in: price_pu,
                price_in: price,
            });
            output.offers_cleared.push(ClearedOffer {
                timestep: row.timestep,
                id_agent_out: joined_row.id_agent_out.clone(),
                trade_ordinal: ordinal,
                energy_out: energy,
                price_pu_out: price_pu,
                price_out: price,
            });
            output.transactions.push(Transaction {
                timestep: row.timestep,
                id_agent: joined_row.id_agent_in.clone(),
                ordinal,
                type_transaction: TransactionType::Market,
                energy_in: energy,
                energy_out: 0,
                price_pu_in: price_pu,
                price_pu_out: 0,
                price_in: price,
                price_out: 0,
                quality: 0,
            });
            output.transactions.push(Transaction {
                timestep: row.timestep,
                id_agent: joined_row.id_agent_out.clone(),
                ordinal,
                type_transaction: TransactionType::Market,
                energy_in: 0,
                energy_out: energy,
                price_pu_in: 0,
                price_pu_out: price_pu,
                price_in: 0,
                price_out: price,
                quality: 0,
            });

            *cleared_in.entry(joined_row.id_agent_in.clone()).or_insert(0) += energy;
            *cleared_out.entry(joined_row.id_agent_out.clone()).or_insert(0) += energy;
        }

        for bid in &bids {
            if retailer_ids.contains(bid.id_agent_in.as_str()) {
                continue;
            }
            let done = cleared_in.get(&bid.id_agent_in).copied().unwrap_or(0);
            let residual = bid.energy_in.saturating_sub(done);
            if residual > 0 {
                output.bids_uncleared.push(UnclearedBid {
                    timestep: row.timestep,
                    id_agent_in: bid.id_agent_in.clone(),
                    energy_type: bid.energy_type.clone(),
                    energy_in: residual,
                });
            }
        }
        for offer in &offers {
            if retailer_ids.contains(offer.id_agent_out.as_str()) {
                continue;
            }
            let done = cleared_out.get(&offer.id_agent_out).copied().unwrap_or(0);
            let residual = offer.energy_out.saturating_sub(done);
            if residual > 0 {
                output.offers_uncleared.push(UnclearedOffer {
                    timestep: row.timestep,
                    id_agent_out: offer.id_agent_out.clone(),
                    energy_type: offer.energy_type.clone(),
                    energy_out: residual,
                });
            }
        }

        Ok(())
    }

    /// `settle` action (SPEC_FULL.md §4.8-§4.9).
    async fn do_settle(&self, row: &TimetableRow, retailer_quotes: &[RetailerQuote], output: &mut StepOutput) -> Result<(), ClearingError> {
        let (bids_uncleared, offers_uncleared) = self.data_source.fetch_uncleared(&row.dimensions, row.timestep).await?;
        if bids_uncleared.is_empty() && offers_uncleared.is_empty() && output.transactions.is_empty() {
            return Ok(()); // nothing produced yet this row and nothing to balance.
        }

        let retailer = retailer_quotes.first().ok_or_else(|| ClearingError::SchemaMismatch {
            context: RowContext::new(&row.dimensions, row.timestamp, row.timestep, "settle"),
            message: "no retailer quote available to price balancing energy".to_string(),
        })?;

        if !bids_uncleared.is_empty() || !offers_uncleared.is_empty() {
            let next_ordinal = output.transactions.iter().map(|t| t.ordinal + 1).max().unwrap_or(0);
            let balancing = balancing_transactions(&bids_uncleared, &offers_uncleared, retailer, next_ordinal);
            output.transactions.extend(balancing);
            self.data_source.clear_uncleared(&row.dimensions, row.timestep).await?;
        }

        // Grid fees and levies re-price whatever the step's transactions table
        // holds at this point (market rows from a same-row clear, plus any
        // balancing rows just emitted), per SPEC_FULL.md §4.9.
        let next_ordinal = output.transactions.iter().map(|t| t.ordinal + 1).max().unwrap_or(0);
        let extra = grid_and_levies_transactions(&output.transactions, retailer, next_ordinal);
        output.transactions.extend(extra);

        Ok(())
    }
}
