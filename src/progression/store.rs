use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::catalog::{RewardCatalog, Stage, Tier};
use super::kv::KeyValueStore;
use super::state::{ProgressionState, ProgressionSummary, RewardOutcome};

/// Key under which the progression record is persisted
pub const STORAGE_KEY: &str = "reading_tutor_progression";

/// Reward and level bookkeeping shared by every reading session
///
/// Reads are served from memory and never wait on I/O; until `load()` has
/// completed they see the default state (zero currency, lowest tier). Every
/// mutation saves the full record. A failed save leaves the store dirty and
/// `flush()` retries it.
pub struct ProgressionStore {
    kv: Arc<dyn KeyValueStore>,
    catalog: RewardCatalog,
    state: RwLock<ProgressionState>,
    save_lock: Mutex<()>,
    dirty: AtomicBool,
}

impl ProgressionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, catalog: RewardCatalog) -> Self {
        Self {
            kv,
            catalog,
            state: RwLock::new(ProgressionState::default()),
            save_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Load the saved record; a missing record means first run
    pub async fn load(&self) -> Result<ProgressionState> {
        let saved = self
            .kv
            .get(STORAGE_KEY)
            .await
            .context("Failed to read progression state")?;

        let mut loaded = match saved {
            Some(json) => match serde_json::from_str::<ProgressionState>(&json) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Ignoring unreadable progression record: {}", e);
                    ProgressionState::default()
                }
            },
            None => {
                info!("No saved progression, starting fresh");
                ProgressionState::default()
            }
        };

        // Unlocks follow currency; restore any the record is missing
        let currency = loaded.currency;
        for companion in self.catalog.companions_for(currency) {
            loaded.unlocked.insert(companion.id.to_string());
        }

        info!(
            "Progression loaded: {} currency, {} words read, tier {}",
            loaded.currency,
            loaded.total_words_read,
            self.catalog.tier_for(loaded.currency).name
        );

        *self.write_state() = loaded.clone();
        Ok(loaded)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ProgressionState {
        self.read_state().clone()
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    pub fn current_tier(&self) -> Tier {
        let currency = self.read_state().currency;
        self.catalog.tier_for(currency).clone()
    }

    pub fn current_stage(&self) -> Option<Stage> {
        let words = self.read_state().total_words_read;
        self.catalog.stage_for(words).cloned()
    }

    pub fn summary(&self) -> ProgressionSummary {
        let state = self.state();
        let tier = self.catalog.tier_for(state.currency).clone();
        let next_tier = self
            .catalog
            .tiers()
            .iter()
            .find(|t| t.threshold > state.currency)
            .cloned();

        ProgressionSummary {
            currency: state.currency,
            tier,
            next_tier,
            total_words_read: state.total_words_read,
            best_streak: state.best_streak,
            current_streak: state.current_streak,
            pages_completed: state.pages_completed,
            companions_unlocked: state.unlocked.len(),
            stage: self.catalog.stage_for(state.total_words_read).cloned(),
        }
    }

    /// Record a correctly read word at the given session streak
    ///
    /// Grants the base reward plus the streak bonus when `streak` is a bonus
    /// milestone. The bonus fires every time the streak value is reached.
    pub async fn record_correct_word(&self, streak: u32) -> RewardOutcome {
        let outcome = {
            let mut state = self.write_state();
            state.total_words_read += 1;
            state.current_streak = streak;
            if streak > state.best_streak {
                state.best_streak = streak;
            }

            let rewards = self.catalog.rewards();
            let amount = rewards.correct_word + rewards.streak_bonus(streak);
            self.grant(&mut state, amount)
        };

        debug!(
            "Correct word at streak {}: +{} currency",
            streak, outcome.reward_granted
        );
        self.save().await;
        outcome
    }

    /// Record a reading mistake; resets the current streak
    pub async fn record_mistake(&self) {
        self.write_state().current_streak = 0;
        self.save().await;
    }

    /// Record a passage read to the end
    pub async fn record_page_completed(&self) -> RewardOutcome {
        let outcome = {
            let mut state = self.write_state();
            state.pages_completed += 1;
            let amount = self.catalog.rewards().completed_page;
            self.grant(&mut state, amount)
        };

        info!("Passage completed: +{} currency", outcome.reward_granted);
        self.save().await;
        outcome
    }

    /// Grant the daily login bonus once per calendar day
    pub async fn record_daily_login(&self, today: NaiveDate) -> Option<RewardOutcome> {
        let outcome = {
            let mut state = self.write_state();
            if state.last_login_date == Some(today) {
                return None;
            }
            state.last_login_date = Some(today);
            let amount = self.catalog.rewards().daily_login;
            self.grant(&mut state, amount)
        };

        info!("Daily login bonus: +{} currency", outcome.reward_granted);
        self.save().await;
        Some(outcome)
    }

    /// Whether the latest state has not been persisted yet
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Persist any unsaved state; call before the process exits
    pub async fn flush(&self) -> Result<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        self.persist().await
    }

    fn grant(&self, state: &mut ProgressionState, amount: u64) -> RewardOutcome {
        let previous = self.catalog.tier_for(state.currency).clone();
        state.currency += amount;
        let current = self.catalog.tier_for(state.currency);

        let level_up = (current.level > previous.level).then(|| current.clone());
        if let Some(tier) = &level_up {
            info!("Level up: {} (level {})", tier.name, tier.level);
        }

        let mut newly_unlocked = Vec::new();
        for companion in self.catalog.companions_for(state.currency) {
            if state.unlocked.insert(companion.id.to_string()) {
                info!("Unlocked companion: {}", companion.name);
                newly_unlocked.push(companion.clone());
            }
        }

        RewardOutcome {
            reward_granted: amount,
            level_up,
            newly_unlocked,
        }
    }

    async fn save(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        if let Err(e) = self.persist().await {
            self.dirty.store(true, Ordering::SeqCst);
            warn!("Failed to save progression (will retry on flush): {:#}", e);
        }
    }

    async fn persist(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        // Snapshot under the save lock so saves land in mutation order
        let json = serde_json::to_string(&*self.read_state())
            .context("Failed to serialize progression state")?;

        self.kv
            .set(STORAGE_KEY, &json)
            .await
            .context("Failed to write progression state")?;

        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ProgressionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ProgressionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
