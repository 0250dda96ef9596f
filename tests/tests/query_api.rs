//! Query endpoint behavior: ordering, staleness, absent buckets, and
//! parameter validation.

use axum_test::TestServer;

use integration_tests::{
    fixtures::{self, ASSET_UNKNOWN, ASSET_X},
    setup::TestContext,
};

fn url(asset: &str, resolution: &str, start: &str, end: &str) -> String {
    format!("/query/{}/{}?start={}&end={}", asset, resolution, start, end)
}

#[tokio::test]
async fn empty_range_returns_no_points() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&url(ASSET_X, "hour", &fixtures::at(0), &fixtures::at(3600)))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["asset_id"], ASSET_X);
    assert_eq!(body["resolution"], "hour");
    assert_eq!(body["points"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn buckets_are_stale_until_recomputed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            Some("batch-q1"),
            &[(ASSET_X, fixtures::at(10), 5.0)],
        ))
        .await
        .assert_status_ok();

    // Re-dirtying an aggregated bucket flips it back to stale.
    ctx.drain().await;
    server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            Some("batch-q2"),
            &[(ASSET_X, fixtures::at(20), 7.0)],
        ))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server
        .get(&url(ASSET_X, "minute", &fixtures::at(0), &fixtures::at(60)))
        .await
        .json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["is_stale"], true);
    // The previously computed aggregate is still served while dirty.
    assert_eq!(points[0]["count"], 1);
    assert_eq!(points[0]["avg"], 5.0);

    ctx.drain().await;

    let body: serde_json::Value = server
        .get(&url(ASSET_X, "minute", &fixtures::at(0), &fixtures::at(60)))
        .await
        .json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points[0]["is_stale"], false);
    assert_eq!(points[0]["count"], 2);
    assert_eq!(points[0]["avg"], 6.0);
}

#[tokio::test]
async fn points_come_back_ordered_with_gaps_absent() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Minutes 0 and 2 of the window have data, minute 1 does not.
    server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            Some("batch-gaps"),
            &[
                (ASSET_X, fixtures::at(130), 3.0),
                (ASSET_X, fixtures::at(10), 1.0),
            ],
        ))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let body: serde_json::Value = server
        .get(&url(ASSET_X, "minute", &fixtures::at(0), &fixtures::at(180)))
        .await
        .json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2, "empty minute must not appear as zeros");
    let first: chrono::DateTime<chrono::Utc> =
        points[0]["bucket_start"].as_str().unwrap().parse().unwrap();
    let second: chrono::DateTime<chrono::Utc> =
        points[1]["bucket_start"].as_str().unwrap().parse().unwrap();
    assert!(first < second);
    assert_eq!(points[0]["avg"], 1.0);
    assert_eq!(points[1]["avg"], 3.0);
}

#[tokio::test]
async fn daily_rollup_spans_the_whole_day() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Two readings hours apart collapse into one day bucket.
    server
        .post("/ingest")
        .json(&fixtures::columnar_payload(
            Some("batch-day"),
            &[
                (ASSET_X, fixtures::at(60), 10.0),
                (ASSET_X, fixtures::at(7 * 3600), 30.0),
            ],
        ))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let body: serde_json::Value = server
        .get(&url(ASSET_X, "day", &fixtures::at(0), &fixtures::at(86_400)))
        .await
        .json();
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 2);
    assert_eq!(points[0]["avg"], 20.0);
    assert_eq!(points[0]["min"], 10.0);
    assert_eq!(points[0]["max"], 30.0);
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Unsupported resolution.
    server
        .get(&url(ASSET_X, "week", &fixtures::at(0), &fixtures::at(60)))
        .await
        .assert_status_bad_request();

    // Inverted range.
    let response = server
        .get(&url(ASSET_X, "minute", &fixtures::at(60), &fixtures::at(0)))
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");

    // Malformed asset id.
    server
        .get(&url("not-a-uuid", "minute", &fixtures::at(0), &fixtures::at(60)))
        .await
        .assert_status_bad_request();

    // Unparseable instant.
    server
        .get(&url(ASSET_X, "minute", "yesterday", &fixtures::at(60)))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn unknown_asset_is_a_404() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&url(ASSET_UNKNOWN, "minute", &fixtures::at(0), &fixtures::at(60)))
        .await;
    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "ASSET_001");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["queue_depth"], 0);
}
