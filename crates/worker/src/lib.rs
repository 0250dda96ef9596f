//! Aggregation engine: workers that drain the dirty-range queue and
//! recompute aggregate points from raw data.

pub mod aggregator;
pub mod scheduler;

pub use aggregator::{drain, AggregationWorker, AggregatorConfig};
pub use scheduler::{WorkerConfig, WorkerScheduler};
