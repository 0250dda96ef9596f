//! Ingestion coordinator.
//!
//! `ingest` is exactly-once at batch granularity:
//! 1. A batch_id already in the ledger replays its recorded dirty set.
//! 2. Every asset is checked against the registry before any write.
//! 3. Readings are written replace-on-conflict.
//! 4. The touched span per asset and resolution is merged into the queue.
//! 5. Ledger record, raw writes, and queue merges commit as one unit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use registry::AssetRegistry;
use rollup_core::{read_batch, ColumnarBatch, DirtyRange, Error, Resolution, Result};
use rollup_store::{BatchCommit, NewReading, Store};
use telemetry::metrics;

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Resolutions maintained for every asset.
    pub resolutions: Vec<Resolution>,
    /// Bounded retries for transient storage failures at commit.
    pub max_commit_retries: u32,
    /// Base backoff between commit retries.
    pub retry_backoff: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            resolutions: Resolution::ALL.to_vec(),
            max_commit_retries: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Result of a successful ingest call.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub batch_id: Option<String>,
    /// Validated rows in the batch.
    pub accepted: usize,
    /// Rows that replaced an existing (asset_id, timestamp) value.
    pub conflicts: usize,
    /// Ranges marked dirty by this batch, per asset and resolution.
    pub dirty: Vec<DirtyRange>,
    /// True when the batch_id had already been committed and nothing was
    /// re-written.
    pub replayed: bool,
}

/// Applies validated batches to the store and marks affected ranges dirty.
pub struct IngestionCoordinator {
    store: Arc<dyn Store>,
    registry: Arc<dyn AssetRegistry>,
    config: CoordinatorConfig,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<dyn AssetRegistry>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn resolutions(&self) -> &[Resolution] {
        &self.config.resolutions
    }

    /// Ingests one batch. Exactly-once per batch_id; all-or-nothing effects.
    pub async fn ingest(&self, batch: &ColumnarBatch) -> Result<IngestOutcome> {
        let start = Instant::now();
        metrics().batches_received.inc();

        let validated = read_batch(batch, Utc::now()).inspect_err(|_| {
            metrics().batches_rejected.inc();
        })?;

        // Safe-retry path: a committed batch_id returns its recorded dirty
        // set without touching the store.
        if let Some(id) = &validated.batch_id {
            if let Some(dirty) = self.store.recorded_batch(id).await? {
                info!(batch_id = %id, "Batch already committed, replaying dirty set");
                metrics().batches_replayed.inc();
                return Ok(IngestOutcome {
                    batch_id: Some(id.clone()),
                    accepted: validated.row_count,
                    conflicts: 0,
                    dirty,
                    replayed: true,
                });
            }
        }

        // Assets are never auto-created here; one unknown asset fails the
        // whole batch before any write.
        for group in &validated.groups {
            if !self.registry.asset_exists(group.asset_id).await? {
                metrics().batches_rejected.inc();
                return Err(Error::unknown_asset(group.asset_id));
            }
        }

        let mut readings = Vec::with_capacity(validated.row_count);
        let mut dirty = Vec::with_capacity(validated.groups.len() * self.config.resolutions.len());
        for group in &validated.groups {
            readings.extend(group.readings.iter().map(|r| NewReading {
                asset_id: r.asset_id,
                timestamp: r.timestamp,
                value: r.value,
            }));
            for resolution in &self.config.resolutions {
                dirty.push(DirtyRange::new(
                    group.asset_id,
                    *resolution,
                    resolution.align_span(group.min_timestamp, group.max_timestamp),
                ));
            }
        }

        let outcome = self
            .commit_with_retry(BatchCommit {
                batch_id: validated.batch_id.clone(),
                readings,
                dirty,
            })
            .await?;

        if outcome.replayed {
            // A concurrent submission of the same batch_id won the commit.
            metrics().batches_replayed.inc();
        } else {
            metrics().readings_ingested.inc_by(outcome.written as u64);
            metrics().conflicts_applied.inc_by(outcome.conflicts as u64);
            metrics().ranges_enqueued.inc_by(outcome.dirty.len() as u64);
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        metrics().ingest_latency_ms.observe(latency_ms);

        info!(
            batch_id = validated.batch_id.as_deref().unwrap_or("-"),
            accepted = validated.row_count,
            conflicts = outcome.conflicts,
            dirty_ranges = outcome.dirty.len(),
            latency_ms = latency_ms,
            "Batch committed"
        );

        Ok(IngestOutcome {
            batch_id: validated.batch_id,
            accepted: validated.row_count,
            conflicts: outcome.conflicts,
            dirty: outcome.dirty,
            replayed: outcome.replayed,
        })
    }

    /// Commits with bounded retries on transient storage failures.
    async fn commit_with_retry(
        &self,
        commit: BatchCommit,
    ) -> Result<rollup_store::CommitOutcome> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_commit_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff * attempt;
                warn!(
                    attempt = attempt,
                    backoff_ms = %backoff.as_millis(),
                    "Retrying batch commit"
                );
                tokio::time::sleep(backoff).await;
            }

            match self.store.commit_batch(commit.clone()).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::internal("commit failed with unknown error")))
    }
}
