//! The Local Energy Market clearing pipeline (SPEC_FULL.md §2, §4).

pub mod book;
pub mod coupling;
pub mod data_source;
pub mod engine;
pub mod pricing;
pub mod settlement;
pub mod tables;
pub mod timetable;

pub use data_source::{InMemoryMarketDataSource, MarketDataSource};
pub use engine::ClearingEngine;
pub use tables::StepOutput;
pub use timetable::{TimetableBuilder, TimetableRow};
