//! Configuration schema for a single LEM market instance (SPEC_FULL.md §6, §10.3).
//!
//! Deserialised with `serde` from whatever document format the host prefers
//! (TOML/YAML/JSON); this crate only requires `Deserialize`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{ClearingMethod, ClearingType, Coupling, Pricing, Settling, Timestamp};

/// `timing.start`: either an absolute instant or a seconds offset from the
/// simulation start (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Start {
    Absolute(Timestamp),
    OffsetSeconds(i64),
}

impl Start {
    pub fn resolve(&self, simulation_start: Timestamp) -> Timestamp {
        match self {
            Start::Absolute(ts) => *ts,
            Start::OffsetSeconds(offset) => simulation_start + chrono::Duration::seconds(*offset),
        }
    }
}

/// `clearing.timing` (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub start: Start,
    pub opening: i64,
    pub frequency: i64,
    pub duration: i64,
    pub horizon: (i64, i64),
    pub closing: i64,
    pub settling: Settling,
}

/// `clearing.{type,method,pricing,coupling,timing}` (SPEC_FULL.md §4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearingConfig {
    #[serde(rename = "type")]
    pub clearing_type: ClearingType,
    pub method: ClearingMethod,
    pub pricing: Pricing,
    #[serde(default = "default_coupling")]
    pub coupling: Coupling,
    pub timing: TimingConfig,
}

fn default_coupling() -> Coupling {
    Coupling::None
}

/// `pricing.<retailer>.<component>.{method,fixed,file}` (SPEC_FULL.md §6, §10.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentMethod {
    Fixed,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRates {
    pub sell: i32,
    pub buy: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridFixedRates {
    pub local_sell: i32,
    pub local_buy: i32,
    pub retail_sell: i32,
    pub retail_buy: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig<Rates> {
    pub method: ComponentMethod,
    pub fixed: Option<Rates>,
    pub file: Option<PathBuf>,
}

/// One retailer's pricing configuration across all four cost components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerPricingConfig {
    pub energy: ComponentConfig<FixedRates>,
    pub balancing: ComponentConfig<FixedRates>,
    pub grid: ComponentConfig<GridFixedRates>,
    pub levies: ComponentConfig<FixedRates>,
}

/// The full per-market-instance configuration consumed by the timetable
/// builder and clearing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub region: String,
    pub market: String,
    pub name: String,
    pub clearing: ClearingConfig,
    #[serde(default)]
    pub retailers: HashMap<String, RetailerPricingConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_offset_resolves_relative_to_simulation_start() {
        let sim_start = chrono::Utc::now();
        let start = Start::OffsetSeconds(3600);
        assert_eq!(start.resolve(sim_start), sim_start + chrono::Duration::seconds(3600));
    }

    #[test]
    fn start_absolute_ignores_simulation_start() {
        let fixed = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
        let start = Start::Absolute(fixed);
        assert_eq!(start.resolve(chrono::Utc::now()), fixed);
    }
}
