//! HTTP router setup.

use crate::handlers;
use crate::middleware;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the application router. Control endpoints sit behind the API-key
/// guard; read endpoints are public.
pub fn create(state: Arc<AppState>) -> Router {
    let reads = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/stats", get(handlers::stats))
        .route("/position", get(handlers::position));

    let control = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/refresh", post(handlers::refresh))
        .route("/events", post(handlers::wallet_event))
        .layer(axum::middleware::from_fn(middleware::api_key_auth));

    reads
        .merge(control)
        .layer(axum::middleware::from_fn(middleware::inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
