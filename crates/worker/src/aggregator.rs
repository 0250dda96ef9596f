//! Dirty-range recompute worker.
//!
//! Claims one pending range at a time and recomputes every bucket in it
//! straight from raw data. Every resolution reads raw readings directly,
//! never a finer rollup, so no rounding or provenance drift can compound
//! across resolutions. Recomputation is a pure function of current raw data,
//! which makes at-least-once retry scheduling safe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use rollup_core::{AggregatePoint, Result, TimeRange};
use rollup_store::{DirtyClaim, Store};
use telemetry::metrics;

/// Aggregation worker configuration.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Sleep when the queue is empty.
    pub idle_poll: Duration,
    /// First backoff after a failed recompute.
    pub initial_backoff: Duration,
    /// Backoff ceiling. Retries are unbounded but rate-limited; the cost of
    /// delay is staleness, never data loss.
    pub max_backoff: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_millis(200),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// A single aggregation worker.
pub struct AggregationWorker {
    id: usize,
    store: Arc<dyn Store>,
    config: AggregatorConfig,
}

impl AggregationWorker {
    pub fn new(id: usize, store: Arc<dyn Store>, config: AggregatorConfig) -> Self {
        Self { id, store, config }
    }

    /// Main loop: claim, recompute, repeat. Runs until the task is aborted.
    pub async fn run(&self) {
        let mut backoff = self.config.initial_backoff;

        loop {
            match self.step().await {
                Ok(true) => {
                    backoff = self.config.initial_backoff;
                }
                Ok(false) => {
                    tokio::time::sleep(self.config.idle_poll).await;
                }
                Err(e) => {
                    warn!(worker = self.id, error = %e, "Recompute failed, backing off");
                    metrics().range_retries.inc();
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }
    }

    /// Processes at most one claim. Returns whether any work was done.
    ///
    /// A failure releases the claim so another worker (or a retry here) picks
    /// the range up again; buckets already rewritten stay correct because the
    /// retry recomputes the full range.
    pub async fn step(&self) -> Result<bool> {
        let Some(claim) = self.store.claim_next_dirty().await? else {
            return Ok(false);
        };

        let started = Instant::now();
        match self.recompute(&claim).await {
            Ok(buckets) => {
                self.store.complete_claim(&claim).await?;
                metrics().ranges_completed.inc();
                metrics()
                    .recompute_latency_ms
                    .observe(started.elapsed().as_millis() as u64);
                debug!(
                    worker = self.id,
                    asset_id = %claim.asset_id,
                    resolution = %claim.resolution,
                    range = %claim.range,
                    buckets = buckets,
                    "Range recomputed"
                );
                Ok(true)
            }
            Err(e) => {
                self.store.release_claim(&claim).await?;
                Err(e)
            }
        }
    }

    async fn recompute(&self, claim: &DirtyClaim) -> Result<usize> {
        let step = chrono::Duration::seconds(claim.resolution.length_secs());
        let mut buckets = 0;

        for bucket_start in claim.resolution.buckets_in(claim.range) {
            buckets += 1;
            let bucket = TimeRange::new(bucket_start, bucket_start + step);
            let raws = self.store.raw_in_range(claim.asset_id, bucket).await?;

            if raws.is_empty() {
                // Absence, not a zero row.
                self.store
                    .delete_point(claim.asset_id, claim.resolution, bucket_start)
                    .await?;
                metrics().points_deleted.inc();
                continue;
            }

            let mut sum = 0.0;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut version = 0;
            for r in &raws {
                sum += r.value;
                min = min.min(r.value);
                max = max.max(r.value);
                version = version.max(r.commit_version);
            }

            self.store
                .upsert_point(AggregatePoint {
                    asset_id: claim.asset_id,
                    resolution: claim.resolution,
                    bucket_start,
                    count: raws.len() as u64,
                    avg: sum / raws.len() as f64,
                    min,
                    max,
                    computed_at: Utc::now(),
                    source_commit_version: version,
                })
                .await?;
            metrics().buckets_recomputed.inc();
        }

        Ok(buckets)
    }
}

/// Synchronously drains the queue: claims and recomputes until nothing is
/// pending. Used by tests and one-shot maintenance.
pub async fn drain(store: Arc<dyn Store>) -> Result<usize> {
    let worker = AggregationWorker::new(0, store, AggregatorConfig::default());
    let mut processed = 0;
    while worker.step().await? {
        processed += 1;
    }
    Ok(processed)
}
