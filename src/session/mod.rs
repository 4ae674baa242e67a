//! Reading session management
//!
//! This module provides the `ReadingSession` controller that manages:
//! - Passage tokenization into target words
//! - Word-by-word judgment of spoken tokens
//! - Streak tracking and milestone signals
//! - Reward accrual through the progression store

mod config;
mod passage;
mod session;
mod stats;

pub use config::{MistakePolicy, SessionConfig};
pub use passage::{tokenize_passage, Word};
pub use session::ReadingSession;
pub use stats::{ReadingEvent, SessionState, SessionStats};
