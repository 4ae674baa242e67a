use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Reading control
        .route("/passage", post(handlers::load_passage))
        .route("/speech", post(handlers::submit_speech))
        .route("/session/reset", post(handlers::reset_session))
        // Queries
        .route("/session", get(handlers::get_session))
        .route("/progress", get(handlers::get_progress))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
