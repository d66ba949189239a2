use crate::api;
use crate::state::AgentState;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AgentState) -> Router {
    Router::new()
        .route("/", get(api::all_metrics))
        .route("/run", get(api::all_metrics))
        .route("/run/{id}", get(api::run_one))
        .route("/inventory", get(api::inventory))
        .route("/stats", get(api::stats))
        .route("/write/{id}", post(api::write).put(api::write))
        .fallback(api::not_found)
        .with_state(state)
}
