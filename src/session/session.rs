use super::config::{MistakePolicy, SessionConfig};
use super::passage::{tokenize_passage, Word};
use super::stats::{ReadingEvent, SessionState, SessionStats};
use crate::matcher::{counts_as_mistake, is_close_match, is_filler, normalize_token};
use crate::progression::{ProgressionStore, RewardOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks a reader's progress through one passage
///
/// Spoken tokens are judged strictly in arrival order against the word under
/// the cursor. The cursor only moves forward until the next `load_passage`
/// or `reset`. Tokens arriving with no passage loaded, or after the passage
/// is complete, are dropped.
pub struct ReadingSession {
    /// Session configuration
    config: SessionConfig,

    /// Shared reward bookkeeping
    progression: Arc<ProgressionStore>,

    words: Vec<Word>,
    cursor: usize,
    streak: u32,
    total_read: u64,

    /// When the current passage was loaded
    started_at: DateTime<Utc>,
}

impl ReadingSession {
    pub fn new(config: SessionConfig, progression: Arc<ProgressionStore>) -> Self {
        info!(
            "Creating reading session: {} (mistake policy: {:?})",
            config.session_id, config.mistake_policy
        );

        Self {
            config,
            progression,
            words: Vec::new(),
            cursor: 0,
            streak: 0,
            total_read: 0,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.words.is_empty() {
            SessionState::Empty
        } else if self.cursor >= self.words.len() {
            SessionState::Complete
        } else {
            SessionState::Active
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Word the reader is expected to say next
    pub fn expected_word(&self) -> Option<&Word> {
        self.words.get(self.cursor)
    }

    /// Load a new passage, discarding any previous one
    ///
    /// Text with no readable words leaves the session `Empty`.
    pub fn load_passage(&mut self, text: &str) -> SessionState {
        self.words = tokenize_passage(text);
        self.cursor = 0;
        self.streak = 0;
        self.total_read = 0;
        self.started_at = Utc::now();

        if self.words.is_empty() {
            info!("Passage had no readable words; session is empty");
        } else {
            info!("Loaded passage: {} words", self.words.len());
        }

        self.state()
    }

    /// Discard the passage
    pub fn reset(&mut self) {
        info!("Resetting reading session: {}", self.config.session_id);
        self.words.clear();
        self.cursor = 0;
        self.streak = 0;
        self.total_read = 0;
    }

    /// Submit a recognized fragment, judging each whitespace-separated token in order
    pub async fn submit_fragment(&mut self, fragment: &str) -> Vec<ReadingEvent> {
        let mut events = Vec::new();
        for token in fragment.split_whitespace() {
            events.extend(self.submit_spoken_token(token).await);
        }
        events
    }

    /// Judge one spoken token against the word under the cursor
    pub async fn submit_spoken_token(&mut self, raw: &str) -> Vec<ReadingEvent> {
        if self.state() != SessionState::Active {
            debug!("Dropping token {:?}: no active passage", raw);
            return Vec::new();
        }

        let spoken = normalize_token(raw);
        if spoken.is_empty() {
            return Vec::new();
        }

        let expected = normalize_token(&self.words[self.cursor].text);

        // A filler is only a reading attempt when it is the printed word itself
        if is_filler(&spoken) && spoken != expected {
            debug!("Ignoring filler {:?}", spoken);
            return Vec::new();
        }

        if is_close_match(&spoken, &expected) {
            self.on_correct().await
        } else if counts_as_mistake(&spoken) {
            self.on_mistake(spoken).await
        } else {
            debug!("Ignoring short unmatched token {:?}", spoken);
            Vec::new()
        }
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state(),
            cursor: self.cursor,
            word_count: self.words.len(),
            progress: if self.words.is_empty() {
                0.0
            } else {
                self.cursor as f32 / self.words.len() as f32
            },
            streak: self.streak,
            total_read: self.total_read,
            started_at: self.started_at,
            words: self.words.clone(),
        }
    }

    async fn on_correct(&mut self) -> Vec<ReadingEvent> {
        let index = self.cursor;
        let word = &mut self.words[index];
        word.is_read = true;
        word.is_correct = true;
        let text = word.text.clone();

        self.streak += 1;
        self.total_read += 1;
        self.cursor += 1;

        let reward = self.progression.record_correct_word(self.streak).await;

        let mut events = vec![ReadingEvent::WordCorrect {
            index,
            word: text,
            reward: reward.reward_granted,
        }];
        push_reward_events(&mut events, reward);

        if self.state() == SessionState::Complete {
            events.extend(self.on_finished().await);
        } else if self.config.streak_milestones.contains(&self.streak) {
            info!("Streak milestone: {}", self.streak);
            events.push(ReadingEvent::StreakMilestone {
                streak: self.streak,
            });
        }

        events
    }

    async fn on_mistake(&mut self, spoken: String) -> Vec<ReadingEvent> {
        let index = self.cursor;
        let word = &mut self.words[index];
        word.is_read = true;
        word.is_correct = false;
        let expected = word.text.clone();

        info!("Mistake at word {}: expected {:?}, heard {:?}", index, expected, spoken);

        self.streak = 0;
        if self.config.mistake_policy == MistakePolicy::AdvancePastMiss {
            self.cursor += 1;
        }

        self.progression.record_mistake().await;

        let mut events = vec![ReadingEvent::Mistake {
            index,
            expected,
            spoken,
        }];

        if self.state() == SessionState::Complete {
            events.extend(self.on_finished().await);
        }

        events
    }

    async fn on_finished(&mut self) -> Vec<ReadingEvent> {
        info!(
            "Passage finished: {} of {} words correct",
            self.total_read,
            self.words.len()
        );

        let mut events = vec![ReadingEvent::PassageFinished {
            total_read: self.total_read,
        }];
        let reward = self.progression.record_page_completed().await;
        push_reward_events(&mut events, reward);
        events
    }
}

fn push_reward_events(events: &mut Vec<ReadingEvent>, reward: RewardOutcome) {
    if let Some(tier) = reward.level_up {
        events.push(ReadingEvent::LevelUp { tier });
    }
    for companion in reward.newly_unlocked {
        events.push(ReadingEvent::CompanionUnlocked { companion });
    }
}
