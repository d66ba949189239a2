use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hostmon_collector::Collector;
use hostmon_common::types::{Metric, Metrics};
use hostmon_server::app;
use hostmon_server::plugins::PluginRegistry;
use hostmon_server::state::AgentState;
use serde_json::Value;
use tower::util::ServiceExt;

/// A collector with a fixed answer, so assertions do not depend on the
/// host the tests run on.
struct StaticCollector;

impl Collector for StaticCollector {
    fn id(&self) -> &str {
        "probe"
    }

    fn collect(&mut self) -> anyhow::Result<Metrics> {
        let mut metrics = Metrics::new();
        metrics.insert("value".to_string(), Metric::uint64(42));
        Ok(metrics)
    }
}

fn test_app() -> Router {
    let state = AgentState::new(vec![Box::new(StaticCollector)], PluginRegistry::scan(None));
    app::build_router(state)
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_returns_namespaced_collector_metrics() {
    let app = test_app();

    let (status, body) = request(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["probe.value"]["_type"], "L");
    assert_eq!(body["probe.value"]["_value"], 42);
}

#[tokio::test]
async fn run_route_matches_root() {
    let app = test_app();

    let (status, body) = request(&app, "GET", "/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["probe.value"]["_value"], 42);
}

#[tokio::test]
async fn named_run_returns_only_that_collector() {
    let app = test_app();

    let (status, body) = request(&app, "GET", "/run/probe", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["probe.value"]["_value"], 42);

    let (status, _) = request(&app, "GET", "/run/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submission_is_held_for_the_next_fetch() {
    let app = test_app();

    let (status, _) = request(
        &app,
        "POST",
        "/write/webapp",
        Some(r#"{"hits":{"_type":"L","_value":9}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = request(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["webapp.hits"]["_value"], 9);
    // the built-ins are still there alongside the submission
    assert_eq!(body["probe.value"]["_value"], 42);
}

#[tokio::test]
async fn put_submission_is_accepted() {
    let app = test_app();

    let (status, _) = request(
        &app,
        "PUT",
        "/write/job",
        Some(r#"{"done":{"_type":"I","_value":1}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_submission_is_rejected() {
    let app = test_app();

    let (status, body) = request(&app, "POST", "/write/webapp", Some("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn inventory_is_empty_without_plugins() {
    let app = test_app();

    let (status, body) = request(&app, "GET", "/inventory", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn stats_report_uptime_and_request_counters() {
    let app = test_app();

    let (status, _) = request(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["uptime_secs"].is_number());
    assert!(body["requests_total"].as_u64().unwrap() >= 3);
    assert!(body["requests_bad"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = test_app();

    let (status, _) = request(&app, "GET", "/definitely/not/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
