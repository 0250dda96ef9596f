//! In-process store backed by ordered maps under a single lock.
//!
//! One `RwLock` over the whole state is what makes `commit_batch` atomic and
//! dirty-range merge-or-insert safe under concurrent ingestion. Contention is
//! acceptable here: commits are batch-granular and recomputes read one bucket
//! at a time.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use rollup_core::{
    AggregatePoint, AssetId, DirtyRange, RawReading, Resolution, Result, TimeRange,
};

use crate::ranges;
use crate::store::{BatchCommit, CommitOutcome, DirtyClaim, Store};

type QueueKey = (AssetId, Resolution);

#[derive(Default)]
struct Inner {
    raw: BTreeMap<(AssetId, DateTime<Utc>), RawReading>,
    points: BTreeMap<(AssetId, Resolution, DateTime<Utc>), AggregatePoint>,
    /// Sorted, disjoint pending ranges per queue key.
    pending: HashMap<QueueKey, Vec<TimeRange>>,
    /// Ranges currently claimed by a worker, one at most per key.
    claimed: HashMap<QueueKey, TimeRange>,
    /// Committed batch_id -> dirty ranges produced by that batch.
    ledger: HashMap<String, Vec<DirtyRange>>,
    commit_seq: u64,
}

/// In-memory `Store` implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total raw readings held. Test observability.
    pub fn raw_len(&self) -> usize {
        self.inner.read().raw.len()
    }

    /// Total aggregate points held. Test observability.
    pub fn point_len(&self) -> usize {
        self.inner.read().points.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn commit_batch(&self, commit: BatchCommit) -> Result<CommitOutcome> {
        let mut inner = self.inner.write();

        // Ledger check under the write lock closes the concurrent
        // double-submit window.
        if let Some(id) = &commit.batch_id {
            if let Some(recorded) = inner.ledger.get(id) {
                return Ok(CommitOutcome {
                    written: 0,
                    conflicts: 0,
                    dirty: recorded.clone(),
                    replayed: true,
                });
            }
        }

        inner.commit_seq += 1;
        let version = inner.commit_seq;

        let mut conflicts = 0;
        let written = commit.readings.len();
        for reading in &commit.readings {
            let key = (reading.asset_id, reading.timestamp);
            let prior = inner.raw.insert(
                key,
                RawReading {
                    asset_id: reading.asset_id,
                    timestamp: reading.timestamp,
                    value: reading.value,
                    batch_id: commit.batch_id.clone(),
                    commit_version: version,
                },
            );
            if let Some(prior) = prior {
                conflicts += 1;
                debug!(
                    asset_id = %reading.asset_id,
                    timestamp = %reading.timestamp,
                    old_value = prior.value,
                    new_value = reading.value,
                    "conflict applied: replaced existing reading"
                );
            }
        }

        for dirty in &commit.dirty {
            let key = (dirty.asset_id, dirty.resolution);
            let pending = inner.pending.entry(key).or_default();
            ranges::merge_into(pending, dirty.range);
        }

        if let Some(id) = &commit.batch_id {
            inner.ledger.insert(id.clone(), commit.dirty.clone());
        }

        Ok(CommitOutcome {
            written,
            conflicts,
            dirty: commit.dirty,
            replayed: false,
        })
    }

    async fn recorded_batch(&self, batch_id: &str) -> Result<Option<Vec<DirtyRange>>> {
        Ok(self.inner.read().ledger.get(batch_id).cloned())
    }

    async fn raw_in_range(&self, asset_id: AssetId, range: TimeRange) -> Result<Vec<RawReading>> {
        let inner = self.inner.read();
        Ok(inner
            .raw
            .range((asset_id, range.start)..(asset_id, range.end))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn claim_next_dirty(&self) -> Result<Option<DirtyClaim>> {
        let mut inner = self.inner.write();

        let key = inner
            .pending
            .iter()
            .find(|(key, ranges)| !ranges.is_empty() && !inner.claimed.contains_key(*key))
            .map(|(key, _)| *key);

        let Some(key) = key else {
            return Ok(None);
        };

        let pending = inner.pending.get_mut(&key).unwrap();
        let range = pending.remove(0);
        if pending.is_empty() {
            inner.pending.remove(&key);
        }
        inner.claimed.insert(key, range);

        Ok(Some(DirtyClaim {
            asset_id: key.0,
            resolution: key.1,
            range,
        }))
    }

    async fn complete_claim(&self, claim: &DirtyClaim) -> Result<()> {
        let mut inner = self.inner.write();
        inner.claimed.remove(&(claim.asset_id, claim.resolution));
        Ok(())
    }

    async fn release_claim(&self, claim: &DirtyClaim) -> Result<()> {
        let mut inner = self.inner.write();
        let key = (claim.asset_id, claim.resolution);
        inner.claimed.remove(&key);
        let pending = inner.pending.entry(key).or_default();
        ranges::merge_into(pending, claim.range);
        Ok(())
    }

    async fn upsert_point(&self, point: AggregatePoint) -> Result<()> {
        let mut inner = self.inner.write();
        inner.points.insert(
            (point.asset_id, point.resolution, point.bucket_start),
            point,
        );
        Ok(())
    }

    async fn delete_point(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        bucket_start: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        inner.points.remove(&(asset_id, resolution, bucket_start));
        Ok(())
    }

    async fn points_in_range(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        range: TimeRange,
    ) -> Result<Vec<AggregatePoint>> {
        let inner = self.inner.read();
        Ok(inner
            .points
            .range((asset_id, resolution, range.start)..(asset_id, resolution, range.end))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn pending_ranges(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
    ) -> Result<Vec<TimeRange>> {
        let inner = self.inner.read();
        let key = (asset_id, resolution);
        let mut out = inner.pending.get(&key).cloned().unwrap_or_default();
        if let Some(claimed) = inner.claimed.get(&key) {
            out.push(*claimed);
        }
        Ok(out)
    }

    async fn purge_raw_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.inner.write();
        let before = inner.raw.len();
        inner.raw.retain(|(_, ts), _| *ts >= cutoff);
        Ok(before - inner.raw.len())
    }

    async fn queue_depth(&self) -> Result<usize> {
        let inner = self.inner.read();
        let pending: usize = inner.pending.values().map(|v| v.len()).sum();
        Ok(pending + inner.claimed.len())
    }
}
