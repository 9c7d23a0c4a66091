//! Observability: structured logging setup and decision/delegation metrics.
//!
//! Metrics are recorded through the `metrics` facade when the `prometheus`
//! feature is enabled; the host application installs the exporter.

pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
