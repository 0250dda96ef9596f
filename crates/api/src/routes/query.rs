//! Query endpoint handler.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use rollup_core::{AssetId, Error, Resolution};

use crate::response::{ApiError, QueryResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    start: String,
    end: String,
}

fn parse_instant(label: &str, raw: &str) -> Result<DateTime<Utc>, Error> {
    raw.parse().map_err(|_| {
        Error::invalid_query(format!("{} is not a valid RFC 3339 instant: '{}'", label, raw))
    })
}

/// GET /query/:asset_id/:resolution?start=..&end=.. - ordered aggregate range
/// read. Buckets under a pending dirty range come back with `is_stale: true`.
pub async fn query_handler(
    State(state): State<AppState>,
    Path((asset_id, resolution)): Path<(String, String)>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let asset_id = AssetId::parse(&asset_id)
        .map_err(|_| Error::invalid_query(format!("malformed asset_id '{}'", asset_id)))?;
    let resolution: Resolution = resolution.parse()?;
    let start = parse_instant("start", &params.start)?;
    let end = parse_instant("end", &params.end)?;

    let points = state.query.get_range(asset_id, resolution, start, end).await?;

    Ok(Json(QueryResponse {
        asset_id: asset_id.to_string(),
        resolution,
        points,
    }))
}
