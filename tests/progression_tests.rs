// Integration tests for the progression store
//
// Rewards, tiers and unlocks, plus persistence through the key-value layer.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use reading_tutor::progression::{
    JsonFileStore, KeyValueStore, MemoryStore, ProgressionStore, RewardCatalog, STORAGE_KEY,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn memory_store() -> ProgressionStore {
    ProgressionStore::new(Arc::new(MemoryStore::new()), RewardCatalog::standard())
}

/// Store whose writes fail until told otherwise
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

#[async_trait::async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.inner.set(key, value).await
    }
}

#[tokio::test]
async fn test_streak_bonus_granted_every_time_streak_hits_milestone() -> Result<()> {
    let store = memory_store();

    let first = store.record_correct_word(5).await;
    assert_eq!(first.reward_granted, 1 + 5);

    store.record_mistake().await;
    for streak in 1..5 {
        assert_eq!(store.record_correct_word(streak).await.reward_granted, 1);
    }

    let again = store.record_correct_word(5).await;
    assert_eq!(again.reward_granted, 1 + 5);

    assert_eq!(store.record_correct_word(10).await.reward_granted, 1 + 15);
    assert_eq!(store.record_correct_word(20).await.reward_granted, 1 + 30);
    Ok(())
}

#[tokio::test]
async fn test_streaks_tracked() -> Result<()> {
    let store = memory_store();
    store.record_correct_word(1).await;
    store.record_correct_word(2).await;
    store.record_correct_word(3).await;
    store.record_mistake().await;
    store.record_correct_word(1).await;

    let state = store.state();
    assert_eq!(state.best_streak, 3);
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.total_words_read, 4);
    Ok(())
}

#[tokio::test]
async fn test_level_up_and_unlocks() -> Result<()> {
    let store = memory_store();
    assert_eq!(store.current_tier().name, "Little Acorn");

    // 25 currency: first companion, no new tier
    let page = store.record_page_completed().await;
    assert!(page.level_up.is_none());
    assert_eq!(page.newly_unlocked.len(), 1);
    assert_eq!(page.newly_unlocked[0].id, "owl");

    // 50 currency: second tier
    let page = store.record_page_completed().await;
    let tier = page.level_up.expect("should level up at 50");
    assert_eq!(tier.level, 2);
    assert_eq!(tier.name, "Sprouting Seed");
    assert!(page.newly_unlocked.is_empty());

    // 75 currency: second companion
    let page = store.record_page_completed().await;
    assert!(page.level_up.is_none());
    assert_eq!(page.newly_unlocked.len(), 1);
    assert_eq!(page.newly_unlocked[0].id, "elephant");

    let summary = store.summary();
    assert_eq!(summary.currency, 75);
    assert_eq!(summary.pages_completed, 3);
    assert_eq!(summary.companions_unlocked, 2);
    assert_eq!(summary.next_tier.map(|t| t.threshold), Some(150));

    // Still inside the same band: nothing unlocks twice
    let word = store.record_correct_word(1).await;
    assert!(word.newly_unlocked.is_empty());
    assert!(word.level_up.is_none());
    assert_eq!(store.summary().companions_unlocked, 2);
    Ok(())
}

#[tokio::test]
async fn test_current_tier_is_a_pure_read() -> Result<()> {
    let store = memory_store();
    store.record_page_completed().await;
    store.record_page_completed().await;

    let first = store.current_tier();
    let second = store.current_tier();
    assert_eq!(first, second);
    assert_eq!(store.state().currency, 50);
    Ok(())
}

#[tokio::test]
async fn test_daily_login_once_per_day() -> Result<()> {
    let store = memory_store();
    let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

    assert_eq!(store.record_daily_login(monday).await.map(|o| o.reward_granted), Some(5));
    assert!(store.record_daily_login(monday).await.is_none());
    assert!(store.record_daily_login(tuesday).await.is_some());
    assert_eq!(store.state().currency, 10);
    Ok(())
}

#[tokio::test]
async fn test_stage_follows_words_read() -> Result<()> {
    let store = memory_store();
    assert_eq!(store.current_stage().map(|s| s.id), Some("forest"));

    for _ in 0..50 {
        store.record_correct_word(1).await;
    }
    assert_eq!(store.current_stage().map(|s| s.id), Some("river"));
    Ok(())
}

#[tokio::test]
async fn test_reads_before_load_see_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let kv = Arc::new(JsonFileStore::new(temp_dir.path())?);
    kv.set(STORAGE_KEY, r#"{"currency": 600, "total_words_read": 400}"#).await?;

    let store = ProgressionStore::new(kv, RewardCatalog::standard());
    assert_eq!(store.state().currency, 0);
    assert_eq!(store.current_tier().level, 1);

    let loaded = store.load().await?;
    assert_eq!(loaded.currency, 600);
    assert_eq!(store.current_tier().name, "Reading Star");

    // Unlocks are restored from currency even when the record lacks them
    assert_eq!(loaded.unlocked.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_state_survives_restart() -> Result<()> {
    let temp_dir = TempDir::new()?;

    {
        let kv = Arc::new(JsonFileStore::new(temp_dir.path())?);
        let store = ProgressionStore::new(kv, RewardCatalog::standard());
        store.load().await?;
        store.record_correct_word(1).await;
        store.record_correct_word(2).await;
        store.record_page_completed().await;
        assert!(!store.is_dirty());
    }

    assert!(temp_dir.path().join(format!("{}.json", STORAGE_KEY)).exists());

    let kv = Arc::new(JsonFileStore::new(temp_dir.path())?);
    let store = ProgressionStore::new(kv, RewardCatalog::standard());
    let state = store.load().await?;

    assert_eq!(state.currency, 27);
    assert_eq!(state.total_words_read, 2);
    assert_eq!(state.best_streak, 2);
    assert_eq!(state.pages_completed, 1);
    assert!(state.unlocked.contains("owl"));
    Ok(())
}

#[tokio::test]
async fn test_unreadable_record_starts_fresh() -> Result<()> {
    let kv = Arc::new(MemoryStore::new());
    kv.set(STORAGE_KEY, "not json").await?;

    let store = ProgressionStore::new(kv, RewardCatalog::standard());
    let state = store.load().await?;
    assert_eq!(state.currency, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_save_is_retried_by_flush() -> Result<()> {
    let kv = Arc::new(FlakyStore::default());
    let store = ProgressionStore::new(kv.clone(), RewardCatalog::standard());
    store.load().await?;

    kv.failing.store(true, Ordering::SeqCst);
    store.record_correct_word(1).await;
    assert!(store.is_dirty());
    assert_eq!(store.state().currency, 1);
    assert!(store.flush().await.is_err());

    kv.failing.store(false, Ordering::SeqCst);
    store.flush().await?;
    assert!(!store.is_dirty());

    let saved = kv.get(STORAGE_KEY).await?.expect("record saved");
    assert!(saved.contains("\"currency\":1"));
    Ok(())
}
