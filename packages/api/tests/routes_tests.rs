//! Route tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use api::{AppState, ErrorResponse, PushResponse, SysStats, router};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::NaiveDate;
use db::{DbConfig, NavRepository};
use dispatch::{Coordinator, Dispatcher, Queue, SimpleWorker};
use scrape_core::{AppConfig, AppStatus};
use storage::StatStorage;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState<SimpleWorker>>,
}

fn test_config(sync: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.core.sync = sync;
    config.core.max_notification = 3;
    config.log.hide_token = false;
    config
}

fn build(worker: SimpleWorker, config: AppConfig) -> TestApp {
    let queue = Arc::new(Queue::new(worker, 2).unwrap());
    queue.start().unwrap();

    let coordinator = Coordinator::new(queue).with_hide_token(config.log.hide_token);
    let mut state = AppState::new(config, coordinator, Arc::new(StatStorage::memory()))
        .with_version("9.9.9");
    if let Some(handle) = api::metrics::init_metrics() {
        state = state.with_metrics(handle);
    }

    let state = Arc::new(state);
    TestApp {
        router: router(state.clone()),
        state,
    }
}

fn app(sync: bool) -> TestApp {
    build(SimpleWorker::with_capacity(8), test_config(sync))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn expect_bad_request(app: &TestApp, body: &str, message: &str) {
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/push", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(error.code, 400);
    assert_eq!(error.message, message);
}

#[tokio::test]
async fn push_validates_the_request() {
    let app = app(true);

    expect_bad_request(&app, "{}", "Missing notifications field.").await;
    expect_bad_request(&app, "not json", "Missing notifications field.").await;
    expect_bad_request(
        &app,
        r#"{"notifications": []}"#,
        "Notifications field is empty.",
    )
    .await;

    let four = r#"{"notifications": [
        {"tokens": ["a"]}, {"tokens": ["b"]}, {"tokens": ["c"]}, {"tokens": ["d"]}
    ]}"#;
    expect_bad_request(&app, four, "Max notification count exceeded.").await;

    assert_eq!(app.state.stats.total_count(), 0);
}

#[tokio::test]
async fn sync_push_returns_logs_and_counts() {
    let app = app(true);
    let body = r#"{"notifications": [
        {"notif_id": "n1", "tokens": ["t1", "t2"], "platform": 2, "message": "hello"},
        {"tokens": ["t3", ""], "platform": 1, "message": "broken"}
    ]}"#;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/push", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PushResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(result.success, "ok");
    assert_eq!(result.counts, 4);
    assert_eq!(result.logs.len(), 4);

    let n1: Vec<_> = result.logs.iter().filter(|e| e.id == "n1").collect();
    assert_eq!(n1.len(), 2);
    assert!(n1.iter().all(|e| !e.is_failed() && e.platform == 2));

    // An empty token fails every target of its notification.
    let broken: Vec<_> = result.logs.iter().filter(|e| e.message == "broken").collect();
    assert_eq!(broken.len(), 2);
    assert!(broken.iter().all(|e| e.is_failed()));

    assert_eq!(app.state.stats.total_count(), 4);
}

#[tokio::test]
async fn async_push_acknowledges_without_logs() {
    let app = app(false);
    let body = r#"{"notifications": [{"tokens": ["t1"], "to": "/topics/news"}]}"#;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/push", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PushResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(result.counts, 2);
    assert!(result.logs.is_empty());
}

#[tokio::test]
async fn push_after_shutdown_reports_rejections() {
    let app = app(true);
    app.state.queue().shutdown();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/push",
            r#"{"notifications": [{"tokens": ["t1"]}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PushResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(result.logs.len(), 1);
    assert_eq!(
        result.logs[0].error.as_deref(),
        Some("queue is shutting down")
    );
}

#[tokio::test]
async fn nav_series_are_stored() {
    let db = db::init(&DbConfig::memory()).await.unwrap();
    let repo = NavRepository::new(db);
    let worker = SimpleWorker::with_capacity(4)
        .with_runner(Dispatcher::new().with_nav_repository(repo.clone()).with_fan_out(2));
    let app = build(worker, test_config(true));

    let body = r#"{"series": [
        {"fund_id": "F1", "points": [
            {"date": "2024-01-01", "nav": 1000.0},
            {"date": "2024-01-02", "nav": 1001.5},
            {"date": "2024-01-03", "nav": 1002.25}
        ]}
    ]}"#;
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/nav", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PushResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(result.counts, 1);
    assert_eq!(result.logs.len(), 1);
    assert_eq!(result.logs[0].target, "F1");
    assert!(!result.logs[0].is_failed());

    assert_eq!(repo.count("F1").await.unwrap(), 3);
    let latest = repo
        .get("F1", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(latest.nav, 1002.25);
}

#[tokio::test]
async fn nav_validates_the_request() {
    let app = app(true);
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/nav", r#"{"series": []}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(error.message, "Series field is empty.");
}

#[tokio::test]
async fn app_status_reports_queue_and_totals() {
    let worker = SimpleWorker::with_capacity(4).with_run_fn(|_| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
    });
    let app = build(worker, test_config(false));
    app.state.stats.add_total_count(7);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/push",
            r#"{"notifications": [{"tokens": ["a"]}, {"tokens": ["b"]}, {"tokens": ["c"]}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.clone().oneshot(get("/api/stat/app")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: AppStatus = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(status.version, "9.9.9");
    assert_eq!(status.queue_max, 4);
    assert_eq!(status.queue_usage, 3);
    assert_eq!(status.total_count, 10);
}

#[tokio::test]
async fn metrics_expose_queue_gauges() {
    let app = app(false);
    let response = app.router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("scrape_queue_capacity"));
    assert!(text.contains("scrape_queue_usage"));
    assert!(text.contains("scrape_total_push_count"));
}

#[tokio::test]
async fn operator_endpoints() {
    let app = app(false);

    let response = app.router.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let head = Request::builder()
        .method(Method::HEAD)
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(head).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.clone().oneshot(get("/version")).await.unwrap();
    let version: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(version["version"], "9.9.9");

    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn config_endpoint_serializes_the_running_config() {
    let app = app(true);
    let response = app.router.clone().oneshot(get("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let config: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(config["core"]["sync"], true);
    assert_eq!(config["core"]["max_notification"], 3);
    assert_eq!(config["queue_engine"], "local");
    assert_eq!(config["api"]["push_uri"], "/api/push");
}

#[tokio::test]
async fn sys_stats_count_served_requests() {
    let app = app(false);

    for _ in 0..3 {
        let response = app.router.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/push", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.clone().oneshot(get("/sys/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The stats request itself is recorded after its body is built.
    let stats: SysStats = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(stats.total_count, 4);
    assert_eq!(stats.total_status_code_count["200"], 3);
    assert_eq!(stats.total_status_code_count["400"], 1);
    assert_eq!(app.state.requests.snapshot().total_count, 5);
}

#[tokio::test]
async fn routes_follow_configured_paths() {
    let mut config = test_config(false);
    config.api.push_uri = "/v2/push".to_string();
    config.api.health_uri = "/ping".to_string();
    let app = build(SimpleWorker::with_capacity(8), config);

    let response = app.router.clone().oneshot(get("/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.router.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v2/push", r#"{"notifications": [{"tokens": ["t1"]}]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/push", r#"{"notifications": [{"tokens": ["t1"]}]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
