//! Range queries over aggregate points.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use registry::AssetRegistry;
use rollup_core::{AssetId, Error, Resolution, Result, TimeRange};
use rollup_store::{ranges, Store};
use telemetry::metrics;

/// One returned aggregate bucket.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPoint {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Best-effort: true when a pending dirty range still overlaps this
    /// bucket at read time.
    pub is_stale: bool,
}

/// Serves ordered range reads of aggregate points.
pub struct QueryService {
    store: Arc<dyn Store>,
    registry: Arc<dyn AssetRegistry>,
}

impl QueryService {
    pub fn new(store: Arc<dyn Store>, registry: Arc<dyn AssetRegistry>) -> Self {
        Self { store, registry }
    }

    /// Points with bucket_start in `[start, end)`, ascending. Buckets with no
    /// stored point are omitted, never zero-filled.
    pub async fn get_range(
        &self,
        asset_id: AssetId,
        resolution: Resolution,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QueryPoint>> {
        let began = Instant::now();

        if start >= end {
            return Err(Error::invalid_query("start must precede end"));
        }
        if !self.registry.asset_exists(asset_id).await? {
            return Err(Error::unknown_asset(asset_id));
        }

        let range = TimeRange::new(start, end);
        let pending = self.store.pending_ranges(asset_id, resolution).await?;
        let points = self.store.points_in_range(asset_id, resolution, range).await?;

        let out = points
            .into_iter()
            .map(|p| {
                let bucket = resolution.bucket_of(p.bucket_start);
                QueryPoint {
                    bucket_start: p.bucket_start,
                    count: p.count,
                    avg: p.avg,
                    min: p.min,
                    max: p.max,
                    is_stale: ranges::overlaps_any(&pending, &bucket),
                }
            })
            .collect();

        metrics().queries_served.inc();
        metrics()
            .query_latency_ms
            .observe(began.elapsed().as_millis() as u64);

        Ok(out)
    }
}
