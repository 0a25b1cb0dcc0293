//! Parser variants and their selection

mod advanced;
mod basic;
mod deadline;
mod factory;
pub(crate) mod formats;

pub use advanced::AdvancedParser;
pub use basic::BasicParser;
pub use factory::{ParserFactory, ParserMetrics, ParserMetricsSnapshot, SelectionPlan};
