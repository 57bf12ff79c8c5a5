//! HTTP surface of the position evaluation service.
//!
//! - `GET /health` - liveness check
//! - `GET /eval?fen=...&depth=...` - evaluate a position

pub mod api;
pub mod middleware;

use axum::routing::get;
use axum::Router;
use chess_eval::{Depth, EvalService};
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: EvalService,
    /// Depth used when a request omits `depth`.
    pub default_depth: Depth,
}

impl AppState {
    pub fn new(service: EvalService, default_depth: Depth) -> Self {
        Self {
            service,
            default_depth,
        }
    }
}

/// Build the router with CORS and request timing applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/eval", get(api::eval::get_eval))
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::timing_layer))
        .layer(cors)
}
