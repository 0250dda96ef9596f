//! End-to-end ingestion tests: POST /ingest → dirty queue → aggregation →
//! GET /query.

use std::sync::Arc;

use axum_test::TestServer;
use integration_tests::{
    fixtures::{self, asset_x, ASSET_X},
    mocks::FlakyStore,
    setup::TestContext,
};

use ingest::{CoordinatorConfig, IngestionCoordinator};
use registry::StaticRegistry;
use rollup_core::{ColumnarBatch, Error};

fn query_url(start_offset: i64, end_offset: i64) -> String {
    format!(
        "/query/{}/minute?start={}&end={}",
        ASSET_X,
        fixtures::at(start_offset),
        fixtures::at(end_offset)
    )
}

#[tokio::test]
async fn minute_bucket_aggregates_then_converges_on_late_arrival() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Batch A: two readings in the same minute.
    let response = server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            Some("batch-a"),
            &[
                (ASSET_X, fixtures::at(10), 10.0),
                (ASSET_X, fixtures::at(45), 12.0),
            ],
        ))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accepted"], 2);
    assert_eq!(body["replayed"], false);
    // One dirty range per resolution.
    assert_eq!(body["dirty"].as_array().unwrap().len(), 3);

    ctx.drain().await;

    let response = server.get(&query_url(0, 60)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 2);
    assert_eq!(points[0]["avg"], 11.0);
    assert_eq!(points[0]["min"], 10.0);
    assert_eq!(points[0]["max"], 12.0);
    assert_eq!(points[0]["is_stale"], false);

    // Batch B lands inside the already-aggregated bucket.
    server
        .post("/ingest")
        .json(&fixtures::rows_payload(
            Some("batch-b"),
            &[(ASSET_X, fixtures::at(30), 20.0)],
        ))
        .await
        .assert_status_ok();

    ctx.drain().await;

    let body: serde_json::Value = server.get(&query_url(0, 60)).await.json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 3);
    assert_eq!(points[0]["avg"], 14.0);
    assert_eq!(points[0]["min"], 10.0);
    assert_eq!(points[0]["max"], 20.0);
}

#[tokio::test]
async fn resubmitting_a_batch_changes_nothing() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::columnar_payload(
        Some("batch-idem"),
        &[
            (ASSET_X, fixtures::at(10), 10.0),
            (ASSET_X, fixtures::at(45), 12.0),
        ],
    );

    let first: serde_json::Value = server.post("/ingest").json(&payload).await.json();
    ctx.drain().await;
    let points_after_first: serde_json::Value = server.get(&query_url(0, 60)).await.json();

    let second: serde_json::Value = server.post("/ingest").json(&payload).await.json();
    assert_eq!(second["replayed"], true);
    assert_eq!(second["dirty"], first["dirty"]);

    // Replay enqueued nothing.
    assert_eq!(ctx.drain().await, 0);
    let points_after_second: serde_json::Value = server.get(&query_url(0, 60)).await.json();
    assert_eq!(points_after_first["points"], points_after_second["points"]);
    assert_eq!(ctx.store.raw_len(), 2);
}

#[tokio::test]
async fn duplicate_timestamp_applies_last_committed_value() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            None,
            &[(ASSET_X, fixtures::at(10), 10.0)],
        ))
        .await
        .assert_status_ok();

    let response = server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            None,
            &[(ASSET_X, fixtures::at(10), 99.0)],
        ))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["conflicts"], 1);

    ctx.drain().await;

    let body: serde_json::Value = server.get(&query_url(0, 60)).await.json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points[0]["count"], 1);
    assert_eq!(points[0]["avg"], 99.0);
    assert_eq!(ctx.store.raw_len(), 1, "replacement must not add a row");
}

fn columnar(batch_id: &str, rows: &[(&str, String, f64)]) -> ColumnarBatch {
    ColumnarBatch {
        batch_id: Some(batch_id.to_string()),
        asset_ids: rows.iter().map(|r| r.0.to_string()).collect(),
        timestamps: rows.iter().map(|r| r.1.clone()).collect(),
        values: rows.iter().map(|r| r.2).collect(),
    }
}

#[tokio::test]
async fn transient_commit_failures_are_retried() {
    let store = Arc::new(FlakyStore::failing_commits(2));
    let registry = Arc::new(StaticRegistry::with_assets([asset_x()]));
    let coordinator = IngestionCoordinator::new(
        store.clone(),
        registry,
        CoordinatorConfig {
            retry_backoff: std::time::Duration::from_millis(1),
            ..CoordinatorConfig::default()
        },
    );

    let outcome = coordinator
        .ingest(&columnar("batch-flaky", &[(ASSET_X, fixtures::at(10), 1.0)]))
        .await
        .expect("retries should absorb two failures");
    assert_eq!(outcome.accepted, 1);
    assert_eq!(store.inner().raw_len(), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_storage_error() {
    let store = Arc::new(FlakyStore::failing_commits(10));
    let registry = Arc::new(StaticRegistry::with_assets([asset_x()]));
    let coordinator = IngestionCoordinator::new(
        store.clone(),
        registry,
        CoordinatorConfig {
            max_commit_retries: 2,
            retry_backoff: std::time::Duration::from_millis(1),
            ..CoordinatorConfig::default()
        },
    );

    let err = coordinator
        .ingest(&columnar("batch-dead", &[(ASSET_X, fixtures::at(10), 1.0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.inner().raw_len(), 0, "no partial effects");

    // The caller may retry the same batch_id once storage recovers.
    let outcome = coordinator
        .ingest(&columnar("batch-dead", &[(ASSET_X, fixtures::at(10), 1.0)]))
        .await;
    assert!(outcome.is_err(), "still failing while injections remain");
}
