use chrono::{DateTime, Utc};
use serde::Serialize;

use super::passage::Word;
use crate::progression::{Companion, Tier};

/// Lifecycle state of a reading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No passage loaded
    Empty,
    /// Words remain to be read
    Active,
    /// Every word has been passed
    Complete,
}

/// Signals emitted while a passage is read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadingEvent {
    /// The word at `index` was read correctly
    WordCorrect {
        index: usize,
        word: String,
        reward: u64,
    },
    /// The reader said `spoken` where `expected` was printed
    Mistake {
        index: usize,
        expected: String,
        spoken: String,
    },
    /// The streak reached a configured milestone
    StreakMilestone { streak: u32 },
    /// The cursor reached the end of the passage
    PassageFinished { total_read: u64 },
    /// Accumulated currency crossed into a higher tier
    LevelUp { tier: Tier },
    /// A companion was unlocked
    CompanionUnlocked { companion: Companion },
}

/// Snapshot of a reading session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// Index of the next expected word
    pub cursor: usize,

    pub word_count: usize,

    /// Fraction of the passage behind the cursor, 0.0 to 1.0
    pub progress: f32,

    /// Consecutive correct words since the last mistake
    pub streak: u32,

    /// Words read correctly in this session
    pub total_read: u64,

    /// When the current passage was loaded
    pub started_at: DateTime<Utc>,

    pub words: Vec<Word>,
}
