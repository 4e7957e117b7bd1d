//! Error taxonomy for the clearing engine (see SPEC_FULL.md §7, §10.2).

use crate::types::{MarketDimensions, Timestamp};
use thiserror::Error;

/// Row-scoped context attached to every error that can be traced back to a
/// single timetable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext {
    pub region: String,
    pub market: String,
    pub name: String,
    pub timestamp: Timestamp,
    pub timestep: Timestamp,
    pub action: String,
}

impl RowContext {
    pub fn new(dims: &MarketDimensions, timestamp: Timestamp, timestep: Timestamp, action: impl Into<String>) -> Self {
        Self {
            region: dims.region.clone(),
            market: dims.market.clone(),
            name: dims.name.clone(),
            timestamp,
            timestep,
            action: action.into(),
        }
    }
}

impl std::fmt::Display for RowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "region={} market={} name={} timestamp={} timestep={} action={}",
            self.region, self.market, self.name, self.timestamp, self.timestep, self.action
        )
    }
}

#[derive(Debug, Error)]
pub enum ClearingError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("retailer book could not be aligned to the quote schema at {context}: {message}")]
    SchemaMismatch { context: RowContext, message: String },

    #[error("unsupported action {action:?} at {context}")]
    UnsupportedAction { context: RowContext, action: String },

    #[error("coupling targets non-existent neighbour {neighbour:?} at {context}")]
    UnknownNeighbour { context: RowContext, neighbour: String },

    #[error("coupling cycle detected re-entering {neighbour:?} at {context}")]
    CouplingCycle { context: RowContext, neighbour: String },

    #[error("internal error at {context}: {message}")]
    Internal { context: RowContext, message: String },
}

pub type ClearingResult<T> = Result<T, ClearingError>;
