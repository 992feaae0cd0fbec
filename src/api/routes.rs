//! API route table.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Pipeline monitoring routes, mounted under `/api`.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::service_health))
        .route("/pipeline/status", get(handlers::pipeline_status))
        .route("/pipeline/editor-message", get(handlers::editor_message))
        .route("/pipeline/recovery/:component", post(handlers::trigger_recovery))
        .route("/pipeline/metrics", get(handlers::metrics))
        .route("/pipeline/history", get(handlers::history))
        .route("/pipeline/force-check", post(handlers::force_check))
        .with_state(state)
}
