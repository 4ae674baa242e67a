use super::state::AppState;
use crate::progression::ProgressionSummary;
use crate::session::{ReadingEvent, SessionState, SessionStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoadPassageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    /// Recognized speech; may hold several words
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub events: Vec<ReadingEvent>,
    pub session: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /passage
/// Load a passage and start reading it
pub async fn load_passage(
    State(state): State<AppState>,
    Json(req): Json<LoadPassageRequest>,
) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let loaded = session.load_passage(&req.text);

    if loaded == SessionState::Empty {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "Passage contains no readable words".to_string(),
            }),
        )
            .into_response();
    }

    info!("Passage loaded with {} words", session.words().len());
    (StatusCode::OK, Json(session.snapshot())).into_response()
}

/// POST /speech
/// Submit recognized speech to the current passage
pub async fn submit_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let events = session.submit_fragment(&req.text).await;

    (
        StatusCode::OK,
        Json(SpeechResponse {
            events,
            session: session.snapshot(),
        }),
    )
}

/// POST /session/reset
/// Drop the current passage
pub async fn reset_session(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    session.reset();
    info!("Session reset");
    (StatusCode::OK, Json(session.snapshot()))
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.session.lock().await.snapshot())
}

/// GET /progress
pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressionSummary> {
    Json(state.progression.summary())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
