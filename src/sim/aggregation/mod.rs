//! Hour → day → month reduction of per-feature visibility records.

pub mod aggregator;
pub mod engine;

pub use aggregator::{Aggregator, LoadScope, MetricKind};
pub use engine::AggregationEngine;
