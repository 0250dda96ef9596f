//! Internal telemetry for the rollup engine.
//!
//! In-memory counters and histograms exposed through a global registry,
//! plus tracing setup and component health tracking.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
