//! The `Store` trait: the atomic-commit seam between the coordinator, the
//! aggregation workers, and the query service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollup_core::{AggregatePoint, AssetId, DirtyRange, RawReading, Resolution, Result, TimeRange};

/// One raw observation to commit. `commit_version` is assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewReading {
    pub asset_id: AssetId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A fully validated batch ready to commit as one atomic unit.
#[derive(Debug, Clone)]
pub struct BatchCommit {
    /// Idempotency key, recorded in the ledger when present.
    pub batch_id: Option<String>,
    /// Readings in application order; a later entry for the same
    /// (asset_id, timestamp) wins.
    pub readings: Vec<NewReading>,
    /// Bucket-aligned ranges to merge into the pending queue.
    pub dirty: Vec<DirtyRange>,
}

/// Result of a committed batch.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Readings written (including overwrites).
    pub written: usize,
    /// Readings that replaced an existing (asset_id, timestamp) value.
    pub conflicts: usize,
    /// The dirty ranges recorded for this batch.
    pub dirty: Vec<DirtyRange>,
    /// True when the batch_id was already in the ledger and nothing was
    /// written. Closes the race between two concurrent submissions of the
    /// same batch_id.
    pub replayed: bool,
}

/// An exclusively claimed dirty range. While a claim is outstanding no other
/// worker can claim the same (asset_id, resolution) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyClaim {
    pub asset_id: AssetId,
    pub resolution: Resolution,
    pub range: TimeRange,
}

/// Storage seam for raw readings, aggregate points, and the dirty queue.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically applies a batch: raw upserts (replace-on-conflict), dirty
    /// range merges, and the ledger record for `batch_id`. Either the whole
    /// batch's effects become visible or none do.
    async fn commit_batch(&self, commit: BatchCommit) -> Result<CommitOutcome>;

    /// Dirty ranges recorded for a committed batch_id, if any.
    async fn recorded_batch(&self, batch_id: &str) -> Result<Option<Vec<DirtyRange>>>;

    /// Raw readings for one asset with timestamp in `range`, ascending.
    async fn raw_in_range(&self, asset_id: AssetId, range: TimeRange) -> Result<Vec<RawReading>>;

    /// Claims one pending dirty range, taking exclusive ownership of its
    /// (asset_id, resolution) key. Returns `None` when nothing is claimable.
    async fn claim_next_dirty(&self) -> Result<Option<DirtyClaim>>;

    /// Deletes a processed claim and releases its key.
    async fn complete_claim(&self, claim: &DirtyClaim) -> Result<()>;

    /// Returns a failed claim to the pending queue and releases its key.
    async fn release_claim(&self, claim: &DirtyClaim) -> Result<()>;

    /// Creates or overwrites the aggregate point for its bucket.
    async fn upsert_point(&self, point: AggregatePoint) -> Result<()>;

    /// Removes the aggregate point for a bucket, if present.
    async fn delete_point(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        bucket_start: DateTime<Utc>,
    ) -> Result<()>;

    /// Aggregate points with bucket_start in `range`, ascending.
    async fn points_in_range(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        range: TimeRange,
    ) -> Result<Vec<AggregatePoint>>;

    /// Pending and in-flight dirty ranges for one (asset_id, resolution) key.
    /// Used by the query service to flag stale buckets.
    async fn pending_ranges(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
    ) -> Result<Vec<TimeRange>>;

    /// Retention hook: deletes raw readings older than `cutoff` across all
    /// assets. Returns the number of readings removed.
    async fn purge_raw_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Outstanding dirty ranges, pending plus claimed.
    async fn queue_depth(&self) -> Result<usize>;
}
