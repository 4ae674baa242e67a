// Integration tests for the HTTP control API

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use reading_tutor::http::{create_router, AppState};
use reading_tutor::progression::{MemoryStore, ProgressionStore, RewardCatalog};
use reading_tutor::session::{ReadingSession, SessionConfig};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

fn app() -> Router {
    let progression = Arc::new(ProgressionStore::new(
        Arc::new(MemoryStore::new()),
        RewardCatalog::standard(),
    ));
    let session = ReadingSession::new(SessionConfig::default(), Arc::clone(&progression));
    create_router(AppState::new(Arc::new(Mutex::new(session)), progression))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, json))
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let (status, _) = call(&app(), "GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_read_passage_over_http() -> Result<()> {
    let app = app();

    let (status, session) = call(
        &app,
        "POST",
        "/passage",
        Some(serde_json::json!({ "text": "The cat sat on the mat" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["state"], "active");
    assert_eq!(session["word_count"], 6);

    let (status, reply) = call(
        &app,
        "POST",
        "/speech",
        Some(serde_json::json!({ "text": "the cat um sat" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["session"]["cursor"], 3);
    assert_eq!(reply["events"][0]["type"], "word_correct");
    assert_eq!(reply["events"].as_array().map(Vec::len), Some(3));

    let (_, reply) = call(
        &app,
        "POST",
        "/speech",
        Some(serde_json::json!({ "text": "on the rug" })),
    )
    .await?;
    let events = reply["events"].as_array().cloned().unwrap_or_default();
    let kinds: Vec<_> = events.iter().map(|e| e["type"].clone()).collect();
    // "the" is the fifth correct word in a row
    assert_eq!(
        kinds,
        vec!["word_correct", "word_correct", "streak_milestone", "mistake"]
    );
    let milestone = events.iter().find(|e| e["type"] == "streak_milestone");
    assert_eq!(milestone.map(|e| e["streak"].clone()), Some(serde_json::json!(5)));

    let mistake = events.iter().find(|e| e["type"] == "mistake");
    assert_eq!(mistake.map(|e| e["expected"].clone()), Some(serde_json::json!("mat")));
    assert_eq!(mistake.map(|e| e["spoken"].clone()), Some(serde_json::json!("rug")));

    let (_, progress) = call(&app, "GET", "/progress", None).await?;
    assert_eq!(progress["total_words_read"], 5);
    assert_eq!(progress["current_streak"], 0);
    assert_eq!(progress["tier"]["name"], "Little Acorn");

    let (_, session) = call(&app, "POST", "/session/reset", None).await?;
    assert_eq!(session["state"], "empty");

    let (_, session) = call(&app, "GET", "/session", None).await?;
    assert_eq!(session["word_count"], 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_passage_rejected() -> Result<()> {
    let (status, body) = call(
        &app(),
        "POST",
        "/passage",
        Some(serde_json::json!({ "text": "?! ..." })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
    Ok(())
}
