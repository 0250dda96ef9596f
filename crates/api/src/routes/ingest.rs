//! Ingestion endpoint handler.
//!
//! Accepts batches in two shapes:
//! 1. Columnar: `{ "batch_id": ..., "asset_ids": [...], "timestamps": [...], "values": [...] }`
//! 2. Row-oriented: `{ "batch_id": ..., "rows": [{ "asset_id", "timestamp", "value" }, ...] }`

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use tracing::debug;

use rollup_core::ColumnarBatch;

use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct IngestRow {
    asset_id: String,
    timestamp: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct RowBatch {
    #[serde(default)]
    batch_id: Option<String>,
    rows: Vec<IngestRow>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngestRequest {
    Rows(RowBatch),
    Columns(ColumnarBatch),
}

impl IngestRequest {
    fn into_columnar(self) -> ColumnarBatch {
        match self {
            Self::Columns(batch) => batch,
            Self::Rows(batch) => ColumnarBatch {
                batch_id: batch.batch_id,
                asset_ids: batch.rows.iter().map(|r| r.asset_id.clone()).collect(),
                timestamps: batch.rows.iter().map(|r| r.timestamp.clone()).collect(),
                values: batch.rows.iter().map(|r| r.value).collect(),
            },
        }
    }
}

/// POST /ingest - batch ingestion endpoint.
pub async fn ingest_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let request: IngestRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid batch payload: {}", e)))?;

    let batch = request.into_columnar();
    debug!(
        batch_id = batch.batch_id.as_deref().unwrap_or("-"),
        rows = batch.len(),
        "Received batch"
    );

    let outcome = state.coordinator.ingest(&batch).await?;
    Ok(Json(outcome.into()))
}
