//! HTTP API for driving a reading session without a microphone
//!
//! - POST /passage - Load a passage
//! - POST /speech - Submit recognized speech
//! - POST /session/reset - Drop the current passage
//! - GET /session - Session snapshot
//! - GET /progress - Progression summary
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, LoadPassageRequest, SpeechRequest, SpeechResponse};
pub use routes::create_router;
pub use state::AppState;
