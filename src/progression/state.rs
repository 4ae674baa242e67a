use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::catalog::{Companion, Stage, Tier};

/// Persisted progression record
///
/// Every field has a default so records written by older builds still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionState {
    /// Accumulated reward currency (never decreases)
    pub currency: u64,

    /// Words read correctly across all sessions
    pub total_words_read: u64,

    /// Highest streak ever reached
    pub best_streak: u32,

    /// Streak of the most recent reading activity
    pub current_streak: u32,

    /// Passages read to the end
    pub pages_completed: u32,

    /// Unlocked companion IDs
    pub unlocked: BTreeSet<String>,

    /// Day the daily login bonus was last granted
    pub last_login_date: Option<NaiveDate>,
}

/// Display summary of the progression state
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionSummary {
    pub currency: u64,
    pub tier: Tier,
    pub next_tier: Option<Tier>,
    pub total_words_read: u64,
    pub best_streak: u32,
    pub current_streak: u32,
    pub pages_completed: u32,
    pub companions_unlocked: usize,
    pub stage: Option<Stage>,
}

/// Result of a reward-earning event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewardOutcome {
    /// Currency granted by this event
    pub reward_granted: u64,

    /// New tier, if this event crossed a tier threshold
    pub level_up: Option<Tier>,

    /// Companions unlocked by this event
    pub newly_unlocked: Vec<Companion>,
}
