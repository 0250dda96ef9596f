//! Mock implementations for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use rollup_core::{
    AggregatePoint, AssetId, DirtyRange, Error, RawReading, Resolution, Result, TimeRange,
};
use rollup_store::{BatchCommit, CommitOutcome, DirtyClaim, MemoryStore, Store};

/// Store wrapper that fails the first N `commit_batch` calls with a transient
/// storage error, then delegates to a real `MemoryStore`.
///
/// Exercises the coordinator's bounded-retry path without a real flaky
/// backend.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    commit_failures_left: AtomicU32,
}

impl FlakyStore {
    pub fn failing_commits(n: u32) -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            commit_failures_left: AtomicU32::new(n),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn commit_batch(&self, commit: BatchCommit) -> Result<CommitOutcome> {
        let left = self.commit_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.commit_failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::storage("injected commit failure"));
        }
        self.inner.commit_batch(commit).await
    }

    async fn recorded_batch(&self, batch_id: &str) -> Result<Option<Vec<DirtyRange>>> {
        self.inner.recorded_batch(batch_id).await
    }

    async fn raw_in_range(&self, asset_id: AssetId, range: TimeRange) -> Result<Vec<RawReading>> {
        self.inner.raw_in_range(asset_id, range).await
    }

    async fn claim_next_dirty(&self) -> Result<Option<DirtyClaim>> {
        self.inner.claim_next_dirty().await
    }

    async fn complete_claim(&self, claim: &DirtyClaim) -> Result<()> {
        self.inner.complete_claim(claim).await
    }

    async fn release_claim(&self, claim: &DirtyClaim) -> Result<()> {
        self.inner.release_claim(claim).await
    }

    async fn upsert_point(&self, point: AggregatePoint) -> Result<()> {
        self.inner.upsert_point(point).await
    }

    async fn delete_point(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        bucket_start: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.delete_point(asset_id, resolution, bucket_start).await
    }

    async fn points_in_range(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        range: TimeRange,
    ) -> Result<Vec<AggregatePoint>> {
        self.inner.points_in_range(asset_id, resolution, range).await
    }

    async fn pending_ranges(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
    ) -> Result<Vec<TimeRange>> {
        self.inner.pending_ranges(asset_id, resolution).await
    }

    async fn purge_raw_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.inner.purge_raw_before(cutoff).await
    }

    async fn queue_depth(&self) -> Result<usize> {
        self.inner.queue_depth().await
    }
}
