//! API handlers - thin wrappers over the monitor's boundary operations.
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or [`ApiErrorResponse`].

use axum::extract::{Path, Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::background::{PipelineMonitor, RecoveryOutcome};
use crate::config::defaults::HISTORY_DEFAULT_LIMIT;
use crate::types::{Component, HealthCheckResult, HealthStatus, RecoveryAction, RecoveryAttempt};

/// Upper bound on `?limit=` for the history endpoint.
const HISTORY_MAX_LIMIT: usize = 1000;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub monitor: PipelineMonitor,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// Health of the monitoring service itself.
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub monitoring: bool,
}

#[derive(Debug, Serialize)]
pub struct EditorMessage {
    pub message: String,
    pub status: HealthStatus,
    pub can_publish: bool,
}

/// Result of `POST /api/pipeline/recovery/:component`.
#[derive(Debug, Serialize)]
pub struct RecoveryResponse {
    /// `success`, `failed`, or `already_healthy`
    pub status: &'static str,
    pub component: Component,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RecoveryAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RecoveryOutcome> for RecoveryResponse {
    fn from(outcome: RecoveryOutcome) -> Self {
        match outcome {
            RecoveryOutcome::AlreadyHealthy(component) => Self {
                status: "already_healthy",
                component,
                message: format!("{component} is already healthy"),
                attempt_id: None,
                action: None,
                duration_ms: None,
                error: None,
            },
            RecoveryOutcome::Attempted(attempt) => Self::from(attempt),
        }
    }
}

impl From<RecoveryAttempt> for RecoveryResponse {
    fn from(attempt: RecoveryAttempt) -> Self {
        let (status, message) = if attempt.success {
            ("success", format!("{} recovered via {}", attempt.component, attempt.action))
        } else {
            ("failed", format!("{} recovery via {} failed", attempt.component, attempt.action))
        };
        Self {
            status,
            component: attempt.component,
            message,
            attempt_id: Some(attempt.attempt_id),
            action: Some(attempt.action),
            duration_ms: Some((attempt.duration_ms * 100.0).round() / 100.0),
            error: attempt.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForceCheckResponse {
    pub status: &'static str,
    pub checks: Vec<HealthCheckResult>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn root() -> Response {
    ApiResponse::ok(ServiceInfo {
        service: "Publishing Pipeline Monitor",
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        endpoints: vec![
            "/api/health",
            "/api/pipeline/status",
            "/api/pipeline/editor-message",
            "/api/pipeline/recovery/{component}",
            "/api/pipeline/metrics",
            "/api/pipeline/history",
            "/api/pipeline/force-check",
        ],
    })
}

/// GET /api/health
pub async fn service_health(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(ServiceHealth {
        status: "healthy",
        monitoring: state.monitor.is_running(),
    })
}

/// GET /api/pipeline/status
pub async fn pipeline_status(State(state): State<ApiState>) -> Response {
    let mut status = state.monitor.pipeline_status().await;
    status.uptime_percentage = (status.uptime_percentage * 100.0).round() / 100.0;
    ApiResponse::ok(status)
}

/// GET /api/pipeline/editor-message
pub async fn editor_message(State(state): State<ApiState>) -> Response {
    let status = state.monitor.pipeline_status().await;
    let message = crate::background::aggregator::editor_message(&status);
    ApiResponse::ok(EditorMessage {
        message,
        status: status.overall_status,
        can_publish: status.overall_status.is_healthy(),
    })
}

/// POST /api/pipeline/recovery/:component
pub async fn trigger_recovery(
    State(state): State<ApiState>,
    Path(component): Path<String>,
) -> Response {
    match state.monitor.trigger_recovery(&component).await {
        Ok(outcome) => ApiResponse::ok(RecoveryResponse::from(outcome)),
        Err(e) => e.into_response(),
    }
}

/// GET /api/pipeline/metrics
pub async fn metrics(State(state): State<ApiState>) -> Response {
    let mut metrics = state.monitor.metrics().await;
    metrics.success_rate = (metrics.success_rate * 100.0).round() / 100.0;
    metrics.recovery_success_rate = (metrics.recovery_success_rate * 100.0).round() / 100.0;
    ApiResponse::ok(metrics)
}

/// GET /api/pipeline/history?limit=50
pub async fn history(State(state): State<ApiState>, Query(q): Query<HistoryQuery>) -> Response {
    let limit = q.limit.unwrap_or(HISTORY_DEFAULT_LIMIT).min(HISTORY_MAX_LIMIT);
    ApiResponse::ok(state.monitor.history(limit).await)
}

/// POST /api/pipeline/force-check
pub async fn force_check(State(state): State<ApiState>) -> Response {
    info!("Force check requested over HTTP");
    let checks = state.monitor.force_check().await;
    ApiResponse::ok(ForceCheckResponse {
        status: "completed",
        checks,
    })
}

/// Fallback for unmatched paths.
pub async fn not_found(uri: Uri) -> Response {
    ApiErrorResponse::not_found(format!("No route for {}", uri.path()))
}
