// Integration tests for the reading session controller
//
// These drive a session token by token and check cursor, streak and the
// events handed to the tutor.

use anyhow::Result;
use reading_tutor::progression::{MemoryStore, ProgressionStore, RewardCatalog};
use reading_tutor::session::{
    MistakePolicy, ReadingEvent, ReadingSession, SessionConfig, SessionState,
};
use std::sync::Arc;

fn store() -> Arc<ProgressionStore> {
    Arc::new(ProgressionStore::new(
        Arc::new(MemoryStore::new()),
        RewardCatalog::standard(),
    ))
}

fn session_with(policy: MistakePolicy) -> ReadingSession {
    let config = SessionConfig {
        mistake_policy: policy,
        ..SessionConfig::default()
    };
    ReadingSession::new(config, store())
}

#[tokio::test]
async fn test_reading_whole_passage_completes_session() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    assert_eq!(session.load_passage("The cat sat on the mat"), SessionState::Active);
    assert_eq!(session.words().len(), 6);

    let mut events = Vec::new();
    for token in ["the", "cat", "sat", "on", "the", "mat"] {
        events.extend(session.submit_spoken_token(token).await);
    }

    assert_eq!(session.total_read(), 6);
    assert_eq!(session.streak(), 6);
    assert_eq!(session.state(), SessionState::Complete);
    assert!(session.words().iter().all(|w| w.is_read && w.is_correct));
    assert!(events.contains(&ReadingEvent::PassageFinished { total_read: 6 }));

    Ok(())
}

#[tokio::test]
async fn test_one_edit_typo_is_accepted() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("cat cat");

    session.submit_spoken_token("cat").await;
    let events = session.submit_spoken_token("kat").await;

    assert!(matches!(events[0], ReadingEvent::WordCorrect { index: 1, .. }));
    assert_eq!(session.streak(), 2);
    Ok(())
}

#[tokio::test]
async fn test_filler_mid_passage_changes_nothing() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("The big dog ran");
    session.submit_spoken_token("the").await;

    let before = session.snapshot();
    let events = session.submit_spoken_token("um").await;
    let after = session.snapshot();

    assert!(events.is_empty());
    assert_eq!(before.cursor, after.cursor);
    assert_eq!(before.streak, after.streak);
    assert_eq!(before.words, after.words);
    Ok(())
}

#[tokio::test]
async fn test_filler_that_is_the_printed_word_counts() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("I like cake");
    session.submit_spoken_token("I").await;

    let events = session.submit_spoken_token("like").await;
    assert!(matches!(events[0], ReadingEvent::WordCorrect { index: 1, .. }));
    Ok(())
}

#[tokio::test]
async fn test_mistake_resets_streak_and_holds_cursor() -> Result<()> {
    let mut session = session_with(MistakePolicy::HoldAndReprompt);
    session.load_passage("The happy elephant danced");
    session.submit_fragment("the happy").await;
    assert_eq!(session.streak(), 2);

    let events = session.submit_spoken_token("giraffe").await;

    assert_eq!(
        events,
        vec![ReadingEvent::Mistake {
            index: 2,
            expected: "elephant".to_string(),
            spoken: "giraffe".to_string(),
        }]
    );
    assert_eq!(session.streak(), 0);
    assert_eq!(session.cursor(), 2);
    let word = &session.words()[2];
    assert!(word.is_read && !word.is_correct);

    // The reader gets another go at the same word
    let events = session.submit_spoken_token("elefant").await;
    assert!(matches!(events[0], ReadingEvent::WordCorrect { index: 2, .. }));
    assert!(session.words()[2].is_correct);
    assert_eq!(session.streak(), 1);
    Ok(())
}

#[tokio::test]
async fn test_advance_policy_moves_past_miss() -> Result<()> {
    let mut session = session_with(MistakePolicy::AdvancePastMiss);
    session.load_passage("red green blue");

    session.submit_spoken_token("purple").await;
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.total_read(), 0);

    session.submit_spoken_token("green").await;
    let events = session.submit_spoken_token("yellow").await;

    assert_eq!(session.state(), SessionState::Complete);
    assert!(events.contains(&ReadingEvent::PassageFinished { total_read: 1 }));
    Ok(())
}

#[tokio::test]
async fn test_short_unmatched_tokens_are_ignored() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("Wonderful morning");
    session.submit_spoken_token("wonderful").await;

    let events = session.submit_spoken_token("ok").await;
    assert!(events.is_empty());
    assert_eq!(session.streak(), 1);
    assert!(!session.words()[1].is_read);
    Ok(())
}

#[tokio::test]
async fn test_streak_milestone_emitted() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("one two three four five six seven");

    let events = session.submit_fragment("one two three four five").await;
    assert!(events.contains(&ReadingEvent::StreakMilestone { streak: 5 }));

    let events = session.submit_spoken_token("six").await;
    assert!(!events
        .iter()
        .any(|e| matches!(e, ReadingEvent::StreakMilestone { .. })));
    Ok(())
}

#[tokio::test]
async fn test_cursor_never_moves_backwards() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    session.load_passage("a quick brown fox jumps over the lazy dog");

    let mut last = session.cursor();
    for token in ["a", "quack", "quick", "um", "brown", "fax", "x", "fox", "jumps"] {
        session.submit_spoken_token(token).await;
        assert!(session.cursor() >= last);
        last = session.cursor();
    }
    assert_eq!(session.cursor(), 5);
    Ok(())
}

#[tokio::test]
async fn test_tokens_without_active_passage_are_noops() -> Result<()> {
    let mut session = session_with(MistakePolicy::default());
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.submit_spoken_token("hello").await.is_empty());

    assert_eq!(session.load_passage("  ...  !! "), SessionState::Empty);

    session.load_passage("Hi");
    session.submit_spoken_token("hi").await;
    assert_eq!(session.state(), SessionState::Complete);
    assert!(session.submit_spoken_token("hi").await.is_empty());
    assert_eq!(session.total_read(), 1);

    session.reset();
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.words().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_correct_words_feed_progression() -> Result<()> {
    let progression = store();
    let mut session = ReadingSession::new(SessionConfig::default(), Arc::clone(&progression));
    session.load_passage("The cat sat on the mat");

    let events = session.submit_fragment("the cat sat on the mat").await;

    let state = progression.state();
    assert_eq!(state.total_words_read, 6);
    assert_eq!(state.best_streak, 6);
    assert_eq!(state.pages_completed, 1);
    // 6 words + 5-streak bonus + completed page
    assert_eq!(state.currency, 6 + 5 + 25);

    // Crossing 25 unlocks the first companion
    assert!(events
        .iter()
        .any(|e| matches!(e, ReadingEvent::CompanionUnlocked { companion } if companion.id == "owl")));
    Ok(())
}
