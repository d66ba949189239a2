use crate::state::AgentState;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use hostmon_common::types::{merge_namespaced, Metrics};
use serde_json::json;

/// `GET /` and `GET /run`: collect everything and return one flat metrics
/// object. This is what the broker's reverse fetches land on.
pub async fn all_metrics(State(state): State<AgentState>) -> impl IntoResponse {
    state.stats.record();
    Json(collect_all(&state).await)
}

/// `GET /run/{id}`: run a single built-in collector or plugin.
pub async fn run_one(State(state): State<AgentState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut all = Metrics::new();

    {
        let mut collectors = state.collectors.lock().unwrap();
        if let Some(collector) = collectors.iter_mut().find(|c| c.id() == id) {
            match collector.collect() {
                Ok(metrics) => merge_namespaced(&mut all, &id, metrics),
                Err(e) => tracing::warn!(collector = %id, error = %e, "collection failed"),
            }
            state.stats.record();
            return (StatusCode::OK, Json(all)).into_response();
        }
    }

    if let Some(plugin) = state.plugins.get(&id).cloned() {
        match state.plugins.run(&plugin).await {
            Ok(metrics) => merge_namespaced(&mut all, &id, metrics),
            Err(e) => tracing::warn!(plugin = %id, error = %e, "plugin run failed"),
        }
        state.stats.record();
        return (StatusCode::OK, Json(all)).into_response();
    }

    state.stats.record_bad();
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("unknown collector or plugin '{id}'")})),
    )
        .into_response()
}

/// `GET /inventory`: the discovered plugin set.
pub async fn inventory(State(state): State<AgentState>) -> impl IntoResponse {
    state.stats.record();
    Json(state.plugins.inventory().to_vec())
}

/// `GET /stats`: agent self-stats.
pub async fn stats(State(state): State<AgentState>) -> impl IntoResponse {
    state.stats.record();
    let (total, bad) = state.stats.snapshot();
    Json(json!({
        "uptime_secs": (Utc::now() - state.start_time).num_seconds(),
        "requests_total": total,
        "requests_bad": bad,
    }))
}

/// `POST|PUT /write/{id}`: accept a metrics submission and hold it for the
/// next fetch, namespaced under the submission id.
pub async fn write(
    State(state): State<AgentState>,
    Path(id): Path<String>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    match serde_json::from_slice::<Metrics>(&body) {
        Ok(metrics) => {
            state.stats.record();
            tracing::debug!(id = %id, count = metrics.len(), "submission stored");
            state.receiver.put(&id, metrics);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            state.stats.record_bad();
            tracing::warn!(id = %id, error = %e, "rejecting submission");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

pub async fn not_found(State(state): State<AgentState>, uri: Uri) -> impl IntoResponse {
    state.stats.record_bad();
    tracing::warn!(uri = %uri, "not found");
    StatusCode::NOT_FOUND
}

async fn collect_all(state: &AgentState) -> Metrics {
    let mut all = Metrics::new();

    // built-ins under the lock, plugins after it is released
    {
        let mut collectors = state.collectors.lock().unwrap();
        for collector in collectors.iter_mut() {
            match collector.collect() {
                Ok(metrics) => merge_namespaced(&mut all, collector.id(), metrics),
                Err(e) => {
                    tracing::warn!(collector = collector.id(), error = %e, "collection failed");
                }
            }
        }
    }

    all.extend(state.plugins.run_all().await);
    all.extend(state.receiver.snapshot());
    all
}
