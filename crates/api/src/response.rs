//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use ingest::QueryPoint;
use rollup_core::{DirtyRange, Resolution, RowViolation};

/// One dirty range in wire form.
#[derive(Debug, Serialize)]
pub struct DirtyRangeBody {
    pub asset_id: String,
    pub resolution: Resolution,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&DirtyRange> for DirtyRangeBody {
    fn from(d: &DirtyRange) -> Self {
        Self {
            asset_id: d.asset_id.to_string(),
            resolution: d.resolution,
            start: d.range.start,
            end: d.range.end,
        }
    }
}

/// Success response for ingestion.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub accepted: usize,
    pub conflicts: usize,
    /// True when the batch_id was already committed and this call re-wrote
    /// nothing.
    pub replayed: bool,
    pub dirty: Vec<DirtyRangeBody>,
}

impl From<ingest::IngestOutcome> for IngestResponse {
    fn from(outcome: ingest::IngestOutcome) -> Self {
        Self {
            success: true,
            batch_id: outcome.batch_id,
            accepted: outcome.accepted,
            conflicts: outcome.conflicts,
            replayed: outcome.replayed,
            dirty: outcome.dirty.iter().map(DirtyRangeBody::from).collect(),
        }
    }
}

/// Success response for range queries.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub asset_id: String,
    pub resolution: Resolution,
    pub points: Vec<QueryPoint>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Per-row violations, present only for batch validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<RowViolation>>,
}

/// API error wrapper carrying the HTTP status.
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse {
                error: msg.into(),
                code: "VALID_001".into(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<rollup_core::Error> for ApiError {
    fn from(err: rollup_core::Error) -> Self {
        let details = match &err {
            rollup_core::Error::Validation { violations } if !violations.is_empty() => {
                Some(violations.clone())
            }
            _ => None,
        };

        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            response: ErrorResponse {
                error: err.to_string(),
                code: err.code().to_string(),
                details,
            },
        }
    }
}
