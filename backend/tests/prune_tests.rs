mod common;

use std::time::Duration as StdDuration;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_prune_removes_only_expired_uploads() {
    let setup = TestSetup::with_retention(StdDuration::from_secs(300));
    let now = Utc::now();
    setup.records.seed(upload("stale", "Stale", now - Duration::minutes(10))).await;
    setup.records.seed(upload("fresh", "Fresh", now - Duration::minutes(1))).await;

    let response = setup.send_get_request("/prune").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        parse_response_body(response).await,
        json!({"matched": 1, "released": 1, "release_failures": 0, "deleted": 1})
    );
    let remaining: Vec<_> = setup.records.all().await.into_iter().map(|u| u.id).collect();
    assert_eq!(remaining, vec!["fresh"]);
    assert_eq!(setup.media.released().await, vec!["kittens/stale/0"]);
}

#[tokio::test]
async fn test_pruned_uploads_leave_the_gallery() {
    let setup = TestSetup::with_retention(StdDuration::from_secs(60));
    setup
        .records
        .seed(upload("stale", "Whiskers", Utc::now() - Duration::minutes(2)))
        .await;

    setup.send_get_request("/prune").await.unwrap();

    let page = body_text(setup.send_get_request("/gallery").await.unwrap()).await;
    assert!(!page.contains("Whiskers"));
}

#[tokio::test]
async fn test_prune_release_failure_still_deletes_record() {
    let setup = TestSetup::new();
    setup
        .records
        .seed(upload("stale", "Stale", Utc::now() - Duration::hours(1)))
        .await;
    setup.media.fail_release_for("kittens/stale/0").await;

    let response = setup.send_get_request("/prune").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = parse_response_body(response).await;
    assert_eq!(report["release_failures"], 1);
    assert_eq!(report["deleted"], 1);
    assert!(setup.records.all().await.is_empty());
}

#[tokio::test]
async fn test_prune_query_failure_returns_internal_error() {
    let setup = TestSetup::new();
    setup
        .records
        .seed(upload("stale", "Stale", Utc::now() - Duration::hours(1)))
        .await;
    setup.records.fail_queries(true);

    let response = setup.send_get_request("/prune").await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(setup.records.all().await.len(), 1);
    assert!(setup.media.released().await.is_empty());
}

#[tokio::test]
async fn test_prune_delete_failure_returns_internal_error() {
    let setup = TestSetup::new();
    setup
        .records
        .seed(upload("stale", "Stale", Utc::now() - Duration::hours(1)))
        .await;
    setup.records.fail_deletes(true);

    let response = setup.send_get_request("/prune").await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(setup.records.all().await.len(), 1);
}

#[tokio::test]
async fn test_health() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/health").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["status"], "ok");
}
