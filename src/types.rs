//! Core domain types shared across the timetable builder and the clearing
//! engine (SPEC_FULL.md §3, §9).

use serde::{Deserialize, Serialize};

use crate::error::ClearingError;

/// Decision/delivery instant. Nanosecond-resolution, UTC, per SPEC_FULL.md §6.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub type Region = String;
pub type MarketKind = String;
pub type MarketName = String;
pub type AgentId = String;
pub type EnergyType = String;

/// Energy in the smallest energy unit (Wh). Always non-negative.
pub type Energy = u64;

/// Per-unit price in the smallest currency unit per energy unit.
pub type PricePerUnit = i32;

/// Extended/aggregated monetary value in the smallest currency unit.
pub type Money = i64;

/// The four dimensions that scope a market instance (region/market/name are
/// the categorical dimensions; timestamp/timestep travel with individual rows).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketDimensions {
    pub region: Region,
    pub market: MarketKind,
    pub name: MarketName,
}

impl MarketDimensions {
    pub fn new(region: impl Into<Region>, market: impl Into<MarketKind>, name: impl Into<MarketName>) -> Self {
        Self {
            region: region.into(),
            market: market.into(),
            name: name.into(),
        }
    }
}

/// `clearing.type` (SPEC_FULL.md §4.1, §9). `ExPost` is a defined stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearingType {
    ExAnte,
    ExPost,
}

/// `clearing.method` (SPEC_FULL.md §9). `Community` is a defined stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearingMethod {
    Pda,
    Community,
}

/// `clearing.pricing` (SPEC_FULL.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pricing {
    Uniform,
    Discriminatory,
}

/// `clearing.coupling` (SPEC_FULL.md §4.10, §9). `Above`/`Below` are defined
/// stubs that carry the neighbour's name but forward residuals unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coupling {
    #[serde(rename = "none")]
    None,
    Above(MarketName),
    Below(MarketName),
}

/// `timing.settling` (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Settling {
    Continuous,
    Periodic,
}

/// A single action a timetable row dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Clear,
    Settle,
}

/// `action`, modelled as the ordered subset of [`Action`] a row carries
/// instead of a raw comma-joined string (SPEC_FULL.md §9 rationale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    pub clear: bool,
    pub settle: bool,
}

impl ActionSet {
    pub const fn clear_only() -> Self {
        Self { clear: true, settle: false }
    }

    pub const fn settle_only() -> Self {
        Self { clear: false, settle: true }
    }

    pub const fn clear_and_settle() -> Self {
        Self { clear: true, settle: true }
    }

    /// Parses the comma-joined textual form (`"clear"`, `"settle"`, or
    /// `"clear,settle"`). Any other token is a configuration error.
    pub fn parse(s: &str) -> Result<Self, ClearingError> {
        let mut set = Self { clear: false, settle: false };
        for token in s.split(',') {
            match token.trim() {
                "clear" => set.clear = true,
                "settle" => set.settle = true,
                other => {
                    return Err(ClearingError::Configuration {
                        message: format!("unsupported action token {other:?} in {s:?}"),
                    })
                }
            }
        }
        if !set.clear && !set.settle {
            return Err(ClearingError::Configuration {
                message: format!("action string {s:?} names no recognised action"),
            });
        }
        Ok(set)
    }

    /// `clear` always precedes `settle` within a row (SPEC_FULL.md §5).
    pub fn ordered(&self) -> Vec<Action> {
        let mut actions = Vec::with_capacity(2);
        if self.clear {
            actions.push(Action::Clear);
        }
        if self.settle {
            actions.push(Action::Settle);
        }
        actions
    }

    pub fn as_str(&self) -> &'static str {
        match (self.clear, self.settle) {
            (true, true) => "clear,settle",
            (true, false) => "clear",
            (false, true) => "settle",
            (false, false) => "",
        }
    }
}

impl std::fmt::Display for ActionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction kind (SPEC_FULL.md §3, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Market,
    Retail,
    Balancing,
    Grid,
    Levies,
}

/// A quote as submitted by an agent (or synthesised from a retailer row,
/// SPEC_FULL.md §4.2). At most one of `energy_in`/`energy_out` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: Timestamp,
    pub timestep: Timestamp,
    pub id_agent: AgentId,
    pub energy_type: Option<EnergyType>,
    pub energy_in: Energy,
    pub energy_out: Energy,
    pub price_pu_in: PricePerUnit,
    pub price_pu_out: PricePerUnit,
}

/// One retailer's per-timestep prices/quantities (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailerQuote {
    pub timestamp: Timestamp,
    pub dimensions: MarketDimensions,
    pub retailer: AgentId,
    pub energy_price_sell: PricePerUnit,
    pub energy_price_buy: PricePerUnit,
    pub energy_quantity_sell: Energy,
    pub energy_quantity_buy: Energy,
    pub balancing_price_sell: PricePerUnit,
    pub balancing_price_buy: PricePerUnit,
    pub grid_local_sell: PricePerUnit,
    pub grid_local_buy: PricePerUnit,
    pub grid_retail_sell: PricePerUnit,
    pub grid_retail_buy: PricePerUnit,
    pub levies_price_sell: PricePerUnit,
    pub levies_price_buy: PricePerUnit,
}

/// A bid row after the book split of §4.3, carrying its running cumulative
/// energy within the sorted bid stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRow {
    pub timestep: Timestamp,
    pub id_agent_in: AgentId,
    pub energy_type: Option<EnergyType>,
    pub energy_in: Energy,
    pub price_pu_in: PricePerUnit,
    pub energy_cumsum: Energy,
}

/// Symmetric to [`BidRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRow {
    pub timestep: Timestamp,
    pub id_agent_out: AgentId,
    pub energy_type: Option<EnergyType>,
    pub energy_out: Energy,
    pub price_pu_out: PricePerUnit,
    pub energy_cumsum: Energy,
}

/// A cleared bid lot (SPEC_FULL.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearedBid {
    pub timestep: Timestamp,
    pub id_agent_in: AgentId,
    pub trade_ordinal: u32,
    pub energy_in: Energy,
    pub price_pu_in: PricePerUnit,
    pub price_in: Money,
}

/// Symmetric to [`ClearedBid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearedOffer {
    pub timestep: Timestamp,
    pub id_agent_out: AgentId,
    pub trade_ordinal: u32,
    pub energy_out: Energy,
    pub price_pu_out: PricePerUnit,
    pub price_out: Money,
}

/// A residual (unmatched) bid (SPEC_FULL.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnclearedBid {
    pub timestep: Timestamp,
    pub id_agent_in: AgentId,
    pub energy_type: Option<EnergyType>,
    pub energy_in: Energy,
}

/// Symmetric to [`UnclearedBid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnclearedOffer {
    pub timestep: Timestamp,
    pub id_agent_out: AgentId,
    pub energy_type: Option<EnergyType>,
    pub energy_out: Energy,
}

/// A settlement transaction (SPEC_FULL.md §3, §4.7-4.9). Exactly one of the
/// `_in`/`_out` column pairs is populated per row, mirroring [`Quote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestep: Timestamp,
    pub id_agent: AgentId,
    pub ordinal: u32,
    pub type_transaction: TransactionType,
    pub energy_in: Energy,
    pub energy_out: Energy,
    pub price_pu_in: PricePerUnit,
    pub price_pu_out: PricePerUnit,
    pub price_in: Money,
    pub price_out: Money,
    pub quality: u8,
}
