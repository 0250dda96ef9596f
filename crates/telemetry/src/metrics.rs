//! In-memory metrics collection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram with fixed millisecond buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; 9],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 9] = [1, 5, 10, 25, 50, 100, 500, 1000, 5000];

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Over every bound, land in the last bucket.
        self.buckets[8].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }
}

/// Collected metrics for the rollup engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub batches_received: Counter,
    pub batches_replayed: Counter,
    pub batches_rejected: Counter,
    pub readings_ingested: Counter,
    pub conflicts_applied: Counter,

    // Dirty-range queue
    pub ranges_enqueued: Counter,
    pub ranges_completed: Counter,
    pub range_retries: Counter,

    // Aggregation
    pub buckets_recomputed: Counter,
    pub points_deleted: Counter,

    // Queries
    pub queries_served: Counter,

    // Latency
    pub ingest_latency_ms: Histogram,
    pub recompute_latency_ms: Histogram,
    pub query_latency_ms: Histogram,

    // Gauges
    pub queue_depth: Gauge,
    pub active_workers: Gauge,
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub batches_received: u64,
    pub batches_replayed: u64,
    pub batches_rejected: u64,
    pub readings_ingested: u64,
    pub conflicts_applied: u64,
    pub ranges_enqueued: u64,
    pub ranges_completed: u64,
    pub range_retries: u64,
    pub buckets_recomputed: u64,
    pub points_deleted: u64,
    pub queries_served: u64,
    pub ingest_latency_mean_ms: f64,
    pub recompute_latency_mean_ms: f64,
    pub query_latency_mean_ms: f64,
    pub queue_depth: u64,
    pub active_workers: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            batches_received: self.batches_received.get(),
            batches_replayed: self.batches_replayed.get(),
            batches_rejected: self.batches_rejected.get(),
            readings_ingested: self.readings_ingested.get(),
            conflicts_applied: self.conflicts_applied.get(),
            ranges_enqueued: self.ranges_enqueued.get(),
            ranges_completed: self.ranges_completed.get(),
            range_retries: self.range_retries.get(),
            buckets_recomputed: self.buckets_recomputed.get(),
            points_deleted: self.points_deleted.get(),
            queries_served: self.queries_served.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            recompute_latency_mean_ms: self.recompute_latency_ms.mean(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
            queue_depth: self.queue_depth.get(),
            active_workers: self.active_workers.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::default);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
