//! # LEM Clearing Engine
//!
//! The clearing and settlement engine for a Local Energy Market (LEM) in an
//! agent-based energy market simulator. It turns a market's declarative
//! timing configuration into a flat timetable of actions, and executes that
//! timetable row by row against a quote/retailer database, producing cleared
//! trades, residual uncleared positions, and balancing/grid/levies
//! transactions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lem_clearing_engine::{ClearingEngine, InMemoryMarketDataSource, TimetableBuilder};
//! use lem_clearing_engine::config::MarketConfig;
//! use std::collections::HashSet;
//!
//! # async fn run(config: MarketConfig, simulation_start: chrono::DateTime<chrono::Utc>, duration: chrono::Duration) -> lem_clearing_engine::error::ClearingResult<()> {
//! let timetable = TimetableBuilder::build(&config, simulation_start, duration)?;
//! let engine = ClearingEngine::new(InMemoryMarketDataSource::new());
//! let known_markets = HashSet::new();
//! for row in &timetable {
//!     engine.execute_row(row, &known_markets).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod market;
pub mod types;
pub mod utils;

pub use error::{ClearingError, ClearingResult};
pub use market::{ClearingEngine, InMemoryMarketDataSource, MarketDataSource, StepOutput, TimetableBuilder, TimetableRow};
