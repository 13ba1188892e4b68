//! HTTP Surface
//!
//! The bridge's axum router: open probe endpoints, auth-gated REST
//! endpoints over the terminal ports, and the SSE bar stream.

use axum::Router;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::routing::get;
use tower_http::cors::CorsLayer;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod sse;
pub mod state;

pub use state::AppState;

/// Build the bridge router over the given state.
#[must_use]
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/history", get(handlers::history))
        .route("/tick", get(handlers::tick))
        .route("/symbols", get(handlers::symbols))
        .route("/stream-bars", get(handlers::stream_bars));

    match state.config.server.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => {
            let cors = CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET])
                .allow_headers(tower_http::cors::Any);
            app = app.layer(cors);
        }
        Err(_) => {
            tracing::warn!(
                origin = %state.config.server.allowed_origin,
                "invalid allowed origin, skipping CORS layer"
            );
        }
    }

    app.with_state(state)
}
