use crate::progression::ProgressionStore;
use crate::session::ReadingSession;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The reading session driven by the API (and by a tutor loop, if running)
    pub session: Arc<Mutex<ReadingSession>>,

    pub progression: Arc<ProgressionStore>,
}

impl AppState {
    pub fn new(session: Arc<Mutex<ReadingSession>>, progression: Arc<ProgressionStore>) -> Self {
        Self {
            session,
            progression,
        }
    }
}
