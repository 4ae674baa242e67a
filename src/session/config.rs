use serde::{Deserialize, Serialize};

/// What the cursor does after a counted reading mistake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakePolicy {
    /// Keep the cursor on the missed word so the reader tries it again
    HoldAndReprompt,
    /// Move on to the next word
    AdvancePastMiss,
}

impl Default for MistakePolicy {
    fn default() -> Self {
        Self::HoldAndReprompt
    }
}

/// Configuration for a reading session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "reading-0b6c...")
    pub session_id: String,

    /// Streak values that trigger a milestone celebration
    /// Default: 5, 10, 20
    pub streak_milestones: Vec<u32>,

    /// Cursor behavior on a mistake; fixed for the lifetime of the session
    pub mistake_policy: MistakePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("reading-{}", uuid::Uuid::new_v4()),
            streak_milestones: vec![5, 10, 20],
            mistake_policy: MistakePolicy::default(),
        }
    }
}
