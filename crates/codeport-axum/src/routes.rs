//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Largest accepted refactor upload.
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// API routes without the `/api` prefix, for nesting.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/mcp/servers", get(handlers::mcp::list_servers))
        .route("/mcp/tools", get(handlers::mcp::list_tools))
        .route(
            "/mcp/servers/{name}/connect",
            post(handlers::mcp::connect),
        )
        .route(
            "/mcp/servers/{name}/disconnect",
            post(handlers::mcp::disconnect),
        )
        .route("/mcp/tools/{tool}/call", post(handlers::mcp::call_tool))
        .route(
            "/refactor",
            post(handlers::refactor::refactor).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

/// Create the main router.
///
/// Axum 0.8 uses brace syntax for path parameters: `{name}`, `{tool}`.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
