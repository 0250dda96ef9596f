//! Batch and timestamp acceptance limits.

/// Maximum rows accepted in a single batch.
pub const MAX_BATCH_ROWS: usize = 10_000;

/// Maximum length of a caller-supplied batch_id.
pub const MAX_BATCH_ID_LEN: usize = 128;

/// Clock-skew allowance for readings stamped slightly ahead of now.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Oldest accepted reading age. Readings beyond this horizon are rejected.
pub const MAX_READING_AGE_DAYS: i64 = 3_650;
