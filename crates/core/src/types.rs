//! Domain types: assets, raw readings, aggregate points, dirty ranges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolution::Resolution;

/// Canonical asset identifier. Assets live in the external registry; the
/// engine only ever checks existence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse from the canonical string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A half-open UTC time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Construct a range. Caller guarantees `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "time range must be non-empty");
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the ranges share an endpoint without overlapping.
    pub fn abuts(&self, other: &TimeRange) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// Union of two overlapping or abutting ranges.
    pub fn merge(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// A committed raw observation. Unique by (asset_id, timestamp); a later
/// commit for the same key replaces the value and bumps commit_version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub asset_id: AssetId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Idempotency key of the batch that committed this value, if supplied.
    pub batch_id: Option<String>,
    /// Monotonic version assigned by the store at commit time.
    pub commit_version: u64,
}

/// Exact aggregate of all raw readings in one bucket, as of `computed_at`.
/// Always recomputed wholesale from raw data, never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub asset_id: AssetId,
    pub resolution: Resolution,
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub computed_at: DateTime<Utc>,
    /// Highest raw commit_version observed in the bucket.
    pub source_commit_version: u64,
}

/// A bucket-aligned interval whose aggregates may be stale relative to the
/// raw store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyRange {
    pub asset_id: AssetId,
    pub resolution: Resolution,
    #[serde(flatten)]
    pub range: TimeRange,
}

impl DirtyRange {
    pub fn new(asset_id: AssetId, resolution: Resolution, range: TimeRange) -> Self {
        Self {
            asset_id,
            resolution,
            range,
        }
    }
}
