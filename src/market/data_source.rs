//! Database façade contract (SPEC_FULL.md §6) and an in-memory reference
//! implementation used by tests and standalone runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ClearingResult;
use crate::market::tables::StepOutput;
use crate::types::{ClearedBid, ClearedOffer, MarketDimensions, Quote, RetailerQuote, Timestamp, Transaction, UnclearedBid, UnclearedOffer};

type StepKey = (MarketDimensions, Timestamp);

/// The database façade the clearing engine consumes (SPEC_FULL.md §6). A
/// real implementation backs this with a columnar store; suspension points
/// are exactly the methods below (SPEC_FULL.md §5).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// `get_bids_offers(region, market_type, market_name, timestep)`.
    async fn fetch_quotes(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<Vec<Quote>>;

    /// Retailer quote(s) whose `timestamp = timestep` and matching dimensions.
    async fn fetch_retailer_quotes(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<Vec<RetailerQuote>>;

    /// Currently persisted residuals for a timestep (populated by an earlier
    /// `clear` action, consumed by `settle`).
    async fn fetch_uncleared(
        &self,
        dims: &MarketDimensions,
        timestep: Timestamp,
    ) -> ClearingResult<(Vec<UnclearedBid>, Vec<UnclearedOffer>)>;

    /// Writes a row's local result tables back (SPEC_FULL.md §4.11 step 5).
    /// Cleared/uncleared tables for `(dims, timestep)` are replaced wholesale
    /// (re-deriving a step is idempotent); transactions are appended.
    async fn commit_step(&self, dims: &MarketDimensions, timestep: Timestamp, output: StepOutput) -> ClearingResult<()>;

    /// Empties the uncleared bid/offer tables for a timestep once balancing
    /// has absorbed the residuals (SPEC_FULL.md §4.8).
    async fn clear_uncleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<()>;
}

#[derive(Default)]
struct Store {
    quotes: HashMap<StepKey, Vec<Quote>>,
    retailer_quotes: HashMap<StepKey, Vec<RetailerQuote>>,
    bids_cleared: HashMap<StepKey, Vec<ClearedBid>>,
    offers_cleared: HashMap<StepKey, Vec<ClearedOffer>>,
    bids_uncleared: HashMap<StepKey, Vec<UnclearedBid>>,
    offers_uncleared: HashMap<StepKey, Vec<UnclearedOffer>>,
    transactions: HashMap<StepKey, Vec<Transaction>>,
}

/// In-memory reference implementation of [`MarketDataSource`], sufficient
/// for tests and for running the engine without a real columnar backend.
#[derive(Default)]
pub struct InMemoryMarketDataSource {
    store: RwLock<Store>,
}

impl InMemoryMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_quotes(&self, dims: &MarketDimensions, timestep: Timestamp, quotes: Vec<Quote>) {
        self.store.write().await.quotes.insert((dims.clone(), timestep), quotes);
    }

    pub async fn seed_retailer_quotes(&self, dims: &MarketDimensions, timestep: Timestamp, quotes: Vec<RetailerQuote>) {
        self.store
            .write()
            .await
            .retailer_quotes
            .insert((dims.clone(), timestep), quotes);
    }

    pub async fn bids_cleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> Vec<ClearedBid> {
        self.store.read().await.bids_cleared.get(&(dims.clone(), timestep)).cloned().unwrap_or_default()
    }

    pub async fn offers_cleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> Vec<ClearedOffer> {
        self.store.read().await.offers_cleared.get(&(dims.clone(), timestep)).cloned().unwrap_or_default()
    }

    pub async fn bids_uncleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> Vec<UnclearedBid> {
        self.store.read().await.bids_uncleared.get(&(dims.clone(), timestep)).cloned().unwrap_or_default()
    }

    pub async fn offers_uncleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> Vec<UnclearedOffer> {
        self.store.read().await.offers_uncleared.get(&(dims.clone(), timestep)).cloned().unwrap_or_default()
    }

    pub async fn transactions(&self, dims: &MarketDimensions, timestep: Timestamp) -> Vec<Transaction> {
        self.store.read().await.transactions.get(&(dims.clone(), timestep)).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketDataSource {
    async fn fetch_quotes(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<Vec<Quote>> {
        Ok(self.store.read().await.quotes.get(&(dims.clone(), timestep)).cloned().unwrap_or_default())
    }

    async fn fetch_retailer_quotes(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<Vec<RetailerQuote>> {
        Ok(self
            .store
            .read()
            .await
            .retailer_quotes
            .get(&(dims.clone(), timestep))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_uncleared(
        &self,
        dims: &MarketDimensions,
        timestep: Timestamp,
    ) -> ClearingResult<(Vec<UnclearedBid>, Vec<UnclearedOffer>)> {
        let store = self.store.read().await;
        let key = (dims.clone(), timestep);
        Ok((
            store.bids_uncleared.get(&key).cloned().unwrap_or_default(),
            store.offers_uncleared.get(&key).cloned().unwrap_or_default(),
        ))
    }

    async fn commit_step(&self, dims: &MarketDimensions, timestep: Timestamp, output: StepOutput) -> ClearingResult<()> {
        let key = (dims.clone(), timestep);
        let mut store = self.store.write().await;
        store.bids_cleared.insert(key.clone(), output.bids_cleared);
        store.offers_cleared.insert(key.clone(), output.offers_cleared);
        store.bids_uncleared.insert(key.clone(), output.bids_uncleared);
        store.offers_uncleared.insert(key.clone(), output.offers_uncleared);
        store.transactions.entry(key).or_default().extend(output.transactions);
        Ok(())
    }

    async fn clear_uncleared(&self, dims: &MarketDimensions, timestep: Timestamp) -> ClearingResult<()> {
        let key = (dims.clone(), timestep);
        let mut store = self.store.write().await;
        store.bids_uncleared.remove(&key);
        store.offers_uncleared.remove(&key);
        Ok(())
    }
}
