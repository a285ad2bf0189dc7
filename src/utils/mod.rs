//! Shared utilities: error taxonomy, metric accumulators and logging setup.

pub mod error;
pub mod logging;
pub mod metrics;
