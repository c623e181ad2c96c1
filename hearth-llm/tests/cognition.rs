//! LLM cognition against a mocked backend.
//!
//! `wiremock` plays the model server, so the success, fallback and retry
//! paths run without a real model.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use hearth_core::RecordKind;
use hearth_core::clock::{ManualClock, SharedClock};
use hearth_core::config::HearthConfig;
use hearth_core::memory::MemoryStream;
use hearth_core::planning::{AgentState, DayPlan};
use hearth_core::types::AgentId;
use hearth_llm::{LlmClient, LlmCognition, LlmError, LlmProvider, LlmRequest};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A server answering every Ollama generate call with `status` and `body`,
/// expecting exactly `calls` requests.
async fn ollama_server(status: u16, body: serde_json::Value, calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(calls)
        .mount(&server)
        .await;
    server
}

fn ollama_reply(text: &str) -> serde_json::Value {
    json!({ "response": text, "eval_count": 17, "done": true })
}

fn ollama(base_url: String, retries: u32) -> LlmCognition {
    LlmCognition::new(LlmClient::new(LlmProvider::Ollama { base_url }, "test-model", retries, 2000))
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single().expect("valid date"))
}

fn deferred_stream(clock: &ManualClock, threshold: usize) -> MemoryStream {
    let mut config = HearthConfig::default();
    config.memory.reflection_threshold = threshold;
    let shared: SharedClock = Arc::new(clock.clone());
    MemoryStream::in_memory(AgentId::from("Alice"), &config, shared).deferred()
}

#[tokio::test]
async fn ollama_reflection_is_parsed_from_json() {
    let server = ollama_server(
        200,
        ollama_reply(r#"{"reflection": "The river is a good place to find wood."}"#),
        1,
    )
    .await;
    let cognition = ollama(server.uri(), 0);

    let text = cognition
        .try_reflect("Alice", &["chopped wood by the river".to_string()])
        .await
        .expect("reflection");
    assert_eq!(text, "The river is a good place to find wood.");
}

#[tokio::test]
async fn openai_compatible_backend_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"reflection\": \"Bob is reliable.\"}" } }],
            "usage": { "completion_tokens": 9 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(
        LlmProvider::OpenAiCompatible {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
        },
        "test-model",
        0,
        2000,
    );
    let response = client
        .generate(&LlmRequest::reflection("sys", "user"))
        .await
        .expect("response");
    assert_eq!(response.tokens_generated, 9);
    assert_eq!(response.model, "test-model");
    assert!(response.text.contains("Bob is reliable."));
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = ollama_server(500, json!({}), 3).await;
    let client = LlmClient::new(LlmProvider::Ollama { base_url: server.uri() }, "m", 2, 2000);

    let err = client
        .generate(&LlmRequest::reflection("sys", "user"))
        .await
        .expect_err("always 500");
    assert!(matches!(err, LlmError::RetriesExhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn failed_reflection_falls_back_to_themes() {
    let server = ollama_server(503, json!({}), 1).await;
    let cognition = ollama(server.uri(), 0);
    let contents: Vec<String> = (0..10).map(|_| "gathered stone".to_string()).collect();

    let text = cognition.reflect("Alice", &contents).await;
    assert!(text.contains("gathered"));
    assert!(text.contains("stone"));
}

#[tokio::test]
async fn deferred_batches_are_completed_by_the_model() {
    let server = ollama_server(200, ollama_reply(r#"{"reflection": "Mining pays off."}"#), 1).await;
    let cognition = ollama(server.uri(), 0);
    let clock = clock();
    let mut stream = deferred_stream(&clock, 3);

    for _ in 0..3 {
        stream.add_observation("mined iron", 0.6, None, "action");
    }
    let stored = cognition.process_pending(&mut stream).await;
    assert_eq!(stored.len(), 1);

    let reflection = stream.store().get(stored[0]).expect("stored");
    assert_eq!(reflection.kind, RecordKind::Reflection);
    assert_eq!(reflection.content, "Mining pays off.");
    assert_eq!(reflection.related_memories.len(), 3);
    assert!(stream.take_pending_reflections().is_empty());
}

#[tokio::test]
async fn plan_is_adopted_from_model_output() {
    let plan = r#"Here is my plan:
{"overview": "Build a shelter", "goals": ["Collect logs"], "hourly_schedule": [{"time": "08:00", "activity": "collect logs"}, {"time": "14:00", "activity": "build walls"}]}"#;
    let server = ollama_server(200, ollama_reply(plan), 1).await;
    let cognition = ollama(server.uri(), 0);
    let clock = clock();
    let mut stream = deferred_stream(&clock, 50);

    let id = cognition.plan_and_adopt(&mut stream, &AgentState::default()).await;
    assert_eq!(stream.current_activity(), "collect logs");
    assert_eq!(
        stream.store().get(id).map(|r| r.content.as_str()),
        Some("Today's plan: Build a shelter")
    );
}

#[tokio::test]
async fn vanished_backend_gives_fallback_plan() {
    let server = MockServer::start().await;
    let url = server.uri();
    drop(server);

    let cognition = ollama(url, 0);
    let plan = cognition.plan_day("Alice", &AgentState::default(), &[]).await;
    assert_eq!(plan, DayPlan::fallback());
}

#[tokio::test]
async fn no_backend_still_reflects_and_plans() {
    let cognition = LlmCognition::new(LlmClient::none());
    let clock = clock();
    let mut stream = deferred_stream(&clock, 10);
    for i in 0..10 {
        stream.add_observation(format!("carried water bucket {i}"), 0.4, None, "action");
    }

    let stored = cognition.process_pending(&mut stream).await;
    assert_eq!(stored.len(), 1);
    assert!(stream.store().get(stored[0]).expect("stored").content.contains("carried"));

    let plan = cognition.plan_day("Alice", &AgentState::default(), &[]).await;
    assert_eq!(plan, DayPlan::fallback());
}
