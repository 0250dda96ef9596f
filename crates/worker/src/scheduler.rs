//! Worker pool scheduler.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use rollup_store::Store;
use telemetry::metrics;

use crate::aggregator::{AggregationWorker, AggregatorConfig};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent aggregation workers.
    pub workers: usize,
    /// How often the queue-depth gauge is refreshed.
    pub gauge_interval: Duration,
    pub aggregator: AggregatorConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            gauge_interval: Duration::from_secs(5),
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// Spawns and owns the aggregation worker pool.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn Store>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Starts all workers plus the queue-depth gauge task.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        for id in 0..self.config.workers {
            let store = self.store.clone();
            let config = self.config.aggregator.clone();
            handles.push(tokio::spawn(async move {
                let worker = AggregationWorker::new(id, store, config);
                worker.run().await;
            }));
        }
        metrics().active_workers.set(self.config.workers as u64);

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_queue_gauge().await;
        }));

        info!(workers = self.config.workers, "Aggregation workers started");
        handles
    }

    async fn run_queue_gauge(&self) {
        let mut ticker = interval(self.config.gauge_interval);

        loop {
            ticker.tick().await;

            match self.store.queue_depth().await {
                Ok(depth) => metrics().queue_depth.set(depth as u64),
                Err(e) => warn!(error = %e, "Queue depth probe failed"),
            }
        }
    }
}
