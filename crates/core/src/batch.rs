//! Columnar batch reading and validation.
//!
//! Validation is batch-atomic: either every row validates or the whole batch
//! is rejected with the offending row indices. Nothing downstream sees a
//! partially valid batch.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::limits::{MAX_BATCH_ID_LEN, MAX_BATCH_ROWS, MAX_FUTURE_SKEW_SECS, MAX_READING_AGE_DAYS};
use crate::{AssetId, Error, Result, RowViolation};

/// An incoming columnar batch: parallel columns of equal length plus an
/// optional caller-supplied idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ColumnarBatch {
    /// Idempotency key. Re-submitting a committed batch_id is a no-op replay.
    #[validate(length(min = 1, max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    /// Canonical asset identifiers, one per row.
    pub asset_ids: Vec<String>,
    /// RFC 3339 UTC instants, one per row.
    pub timestamps: Vec<String>,
    /// Finite readings, one per row.
    pub values: Vec<f64>,
}

impl ColumnarBatch {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single validated row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidReading {
    pub asset_id: AssetId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// All validated rows for one asset, in timestamp order.
#[derive(Debug, Clone)]
pub struct AssetGroup {
    pub asset_id: AssetId,
    pub readings: Vec<ValidReading>,
    /// Earliest timestamp touched by this batch for the asset.
    pub min_timestamp: DateTime<Utc>,
    /// Latest timestamp touched by this batch for the asset.
    pub max_timestamp: DateTime<Utc>,
}

/// Output of the batch reader: per-asset ordered readings plus the batch key.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub batch_id: Option<String>,
    pub groups: Vec<AssetGroup>,
    pub row_count: usize,
}

/// Parses and validates a columnar batch against `now`.
///
/// Rejects the whole batch when any row is malformed, carrying every
/// offending row index and reason.
pub fn read_batch(batch: &ColumnarBatch, now: DateTime<Utc>) -> Result<ValidatedBatch> {
    if let Err(e) = batch.validate() {
        return Err(Error::malformed_batch(format!(
            "batch_id must be 1..={} characters: {}",
            MAX_BATCH_ID_LEN, e
        )));
    }

    let rows = batch.values.len();
    if batch.asset_ids.len() != rows || batch.timestamps.len() != rows {
        return Err(Error::malformed_batch(format!(
            "column lengths differ: {} asset_ids, {} timestamps, {} values",
            batch.asset_ids.len(),
            batch.timestamps.len(),
            rows
        )));
    }
    if rows == 0 {
        return Err(Error::malformed_batch("batch has no rows"));
    }
    if rows > MAX_BATCH_ROWS {
        return Err(Error::malformed_batch(format!(
            "batch has {} rows, exceeds {} limit",
            rows, MAX_BATCH_ROWS
        )));
    }

    let earliest = now - Duration::days(MAX_READING_AGE_DAYS);
    let latest = now + Duration::seconds(MAX_FUTURE_SKEW_SECS);

    let mut violations = Vec::new();
    let mut by_asset: BTreeMap<AssetId, Vec<ValidReading>> = BTreeMap::new();

    for row in 0..rows {
        let asset_id = match AssetId::parse(&batch.asset_ids[row]) {
            Ok(id) => id,
            Err(_) => {
                violations.push(RowViolation::new(
                    row,
                    format!("malformed asset_id '{}'", batch.asset_ids[row]),
                ));
                continue;
            }
        };

        let timestamp = match batch.timestamps[row].parse::<DateTime<Utc>>() {
            Ok(ts) => ts,
            Err(_) => {
                violations.push(RowViolation::new(
                    row,
                    format!("unparseable timestamp '{}'", batch.timestamps[row]),
                ));
                continue;
            }
        };
        if timestamp > latest {
            violations.push(RowViolation::new(
                row,
                format!("timestamp {} is in the future", timestamp.to_rfc3339()),
            ));
            continue;
        }
        if timestamp < earliest {
            violations.push(RowViolation::new(
                row,
                format!(
                    "timestamp {} is older than the accepted {}-day window",
                    timestamp.to_rfc3339(),
                    MAX_READING_AGE_DAYS
                ),
            ));
            continue;
        }

        let value = batch.values[row];
        if !value.is_finite() {
            violations.push(RowViolation::new(row, "value is not finite"));
            continue;
        }

        by_asset.entry(asset_id).or_default().push(ValidReading {
            asset_id,
            timestamp,
            value,
        });
    }

    if !violations.is_empty() {
        return Err(Error::validation(violations));
    }

    let groups = by_asset
        .into_iter()
        .map(|(asset_id, mut readings)| {
            // Stable sort: duplicate timestamps within a batch keep submission
            // order, so the later row wins at the store.
            readings.sort_by_key(|r| r.timestamp);
            let min_timestamp = readings.first().map(|r| r.timestamp).unwrap();
            let max_timestamp = readings.last().map(|r| r.timestamp).unwrap();
            AssetGroup {
                asset_id,
                readings,
                min_timestamp,
                max_timestamp,
            }
        })
        .collect();

    Ok(ValidatedBatch {
        batch_id: batch.batch_id.clone(),
        groups,
        row_count: rows,
    })
}
