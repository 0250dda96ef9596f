//! Aggregation resolutions and bucket math.
//!
//! A bucket is a half-open interval `[bucket_start, bucket_start + length)`
//! aligned to the resolution's length. All arithmetic is done on UTC epoch
//! seconds so alignment is stable regardless of calendar context.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TimeRange;

/// A fixed aggregation granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Minute,
    Hour,
    Day,
}

impl Resolution {
    /// All supported resolutions, finest first.
    pub const ALL: [Resolution; 3] = [Resolution::Minute, Resolution::Hour, Resolution::Day];

    /// Bucket length in seconds.
    pub fn length_secs(&self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Start of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.length_secs();
        let aligned = ts.timestamp().div_euclid(step) * step;
        // Aligned epoch seconds are always representable.
        Utc.timestamp_opt(aligned, 0).unwrap()
    }

    /// The bucket (as a half-open range) containing `ts`.
    pub fn bucket_of(&self, ts: DateTime<Utc>) -> TimeRange {
        let start = self.bucket_start(ts);
        TimeRange::new(start, start + chrono::Duration::seconds(self.length_secs()))
    }

    /// Smallest bucket-aligned half-open range covering the closed span
    /// `[min, max]`.
    pub fn align_span(&self, min: DateTime<Utc>, max: DateTime<Utc>) -> TimeRange {
        let start = self.bucket_start(min);
        let end = self.bucket_start(max) + chrono::Duration::seconds(self.length_secs());
        TimeRange::new(start, end)
    }

    /// Bucket starts contained in a bucket-aligned range, ascending. Lazy:
    /// a wide range never materializes its bucket starts all at once.
    pub fn buckets_in(&self, range: TimeRange) -> impl Iterator<Item = DateTime<Utc>> {
        let step = chrono::Duration::seconds(self.length_secs());
        let mut cursor = self.bucket_start(range.start);
        std::iter::from_fn(move || {
            if cursor >= range.end {
                return None;
            }
            let start = cursor;
            cursor += step;
            Some(start)
        })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Resolution {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(crate::Error::invalid_query(format!(
                "unknown resolution '{}', expected one of: minute, hour, day",
                other
            ))),
        }
    }
}
