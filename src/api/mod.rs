//! REST API module using Axum
//!
//! Exposes the pipeline monitor over HTTP for dashboards and editors:
//! - `/api/health` for the monitoring service itself
//! - `/api/pipeline/*` for status, editor message, metrics, history,
//!   manual recovery and forced checks

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable with a comma-separated list of allowed CORS origins.
pub const CORS_ORIGINS_ENV_VAR: &str = "SENTINEL_CORS_ORIGINS";

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `SENTINEL_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for dashboards served from elsewhere.
fn build_cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            layer.allow_origin(allowed)
        }
        Err(_) => layer,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", routes::api_routes(state))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
