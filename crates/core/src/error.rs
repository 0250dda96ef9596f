//! Unified error types for the rollup engine.
//!
//! Error codes:
//! - VALID_001: Batch rejected wholesale (per-row violations attached)
//! - VALID_002: Malformed query parameters
//! - ASSET_001: Unknown asset
//! - STORE_001: Storage unavailable (retryable)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected batch row with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowViolation {
    /// Zero-based index into the submitted batch.
    pub row: usize,
    pub reason: String,
}

impl RowViolation {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RowViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

/// Unified error type for the rollup engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Batch-atomic validation failure. No writes occurred.
    #[error("[VALID_001] batch rejected: {} row(s) invalid", violations.len())]
    Validation { violations: Vec<RowViolation> },

    /// Malformed query parameters (resolution, time range, identifiers).
    #[error("[VALID_002] {0}")]
    InvalidQuery(String),

    /// Reading or query against an unregistered asset.
    #[error("[ASSET_001] unknown asset: {0}")]
    UnknownAsset(String),

    /// Transient storage failure. Safe to retry with the same batch_id.
    #[error("[STORE_001] storage unavailable: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error from collected row violations.
    pub fn validation(violations: Vec<RowViolation>) -> Self {
        Self::Validation { violations }
    }

    /// Create a validation error for a batch-level (not per-row) defect.
    pub fn malformed_batch(reason: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![RowViolation::new(0, reason)],
        }
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn unknown_asset(asset: impl std::fmt::Display) -> Self {
        Self::UnknownAsset(asset.to_string())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::InvalidQuery(_) => 400,
            Self::UnknownAsset(_) => 404,
            Self::Storage(_) => 503,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALID_001",
            Self::InvalidQuery(_) => "VALID_002",
            Self::UnknownAsset(_) => "ASSET_001",
            Self::Storage(_) => "STORE_001",
            Self::Serialization(_) => "VALID_001",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Row violations attached to a validation error, if any.
    pub fn violations(&self) -> &[RowViolation] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}
