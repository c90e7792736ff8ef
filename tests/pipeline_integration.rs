//! End-to-end tests for ingestion, the response engine, and the HTTP server.
//!
//! Real backends are replaced by a keyword embedder, the in-memory index,
//! and a completion fake that reports how many references it was shown.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chat_recall::backends::Backends;
use chat_recall::config::{parse_config, RetrievalConfig};
use chat_recall::ingest::{ingest_export, upsert_message, ChatExport};
use chat_recall::server::serve;
use chat_recall_core::completion::Completion;
use chat_recall_core::embedding::Embedder;
use chat_recall_core::engine::GenerateRequest;
use chat_recall_core::error::RecallError;
use chat_recall_core::index::memory::InMemoryIndex;
use chat_recall_core::index::{IndexedMessage, MessageIndex, SearchRequest, SimilaritySearch};
use chat_recall_core::models::SimilarityMatch;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// ─── Fakes ──────────────────────────────────────────────────────────

const VOCAB: &[&str] = &["database", "postgres", "lunch", "noon", "deploy", "friday"];

/// One dimension per vocabulary word; other words are ignored.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; VOCAB.len()];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(i) = VOCAB.iter().position(|v| *v == word) {
                v[i] += 1.0;
            }
        }
        Ok(v)
    }
}

/// Replies with the number of reference lines in the system instruction
/// and whether a persona was appended.
struct CountingCompletion;

#[async_trait]
impl Completion for CountingCompletion {
    fn model_name(&self) -> &str {
        "counting"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let refs = system.matches("\nReference [").count();
        let persona = system.ends_with("Answer like a pirate.");
        Ok(format!("refs={} persona={} q={} {{ref:1}}", refs, persona, user))
    }
}

/// An index whose every call fails.
struct UnreachableIndex;

#[async_trait]
impl SimilaritySearch for UnreachableIndex {
    async fn search(&self, _req: &SearchRequest<'_>) -> Result<Vec<SimilarityMatch>> {
        bail!("connection refused")
    }
}

#[async_trait]
impl MessageIndex for UnreachableIndex {
    async fn upsert(&self, _namespace: &str, _message: &IndexedMessage) -> Result<()> {
        bail!("connection refused")
    }
}

fn memory_backends() -> (Backends, Arc<InMemoryIndex>) {
    let index = Arc::new(InMemoryIndex::new());
    let backends = Backends::from_parts(
        Arc::new(KeywordEmbedder),
        index.clone(),
        Arc::new(CountingCompletion),
        "messages",
    );
    (backends, index)
}

fn sample_export() -> ChatExport {
    serde_json::from_value(json!({
        "messages": [
            {"id": 1, "content": "We use Postgres for the main database", "user_id": "u1",
             "created_at": "2024-05-01T10:00:00Z", "is_direct_message": false, "channel_id": "c1"},
            {"id": 2, "content": "Lunch is at noon", "user_id": "u2",
             "created_at": "2024-05-01T11:00:00Z", "is_direct_message": false, "channel_id": "c2"},
            {"id": 3, "content": "The database migration runs before deploy", "user_id": "u2",
             "created_at": "2024-05-02T09:00:00Z", "is_direct_message": true, "receiver_id": "u1"}
        ],
        "users": [{"id": "u1", "username": "ada"}, {"id": "u2", "username": "grace"}],
        "channels": [{"id": "c1", "name": "backend"}, {"id": "c2", "name": "random"}]
    }))
    .unwrap()
}

async fn spawn_server(backends: Backends) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, backends, RetrievalConfig::default())
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

// ─── Ingestion + engine ─────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_then_generate_cites_relevant_messages() {
    let (backends, index) = memory_backends();
    let stats = ingest_export(&backends, &sample_export(), 2).await.unwrap();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(index.len("messages"), 3);

    let result = backends
        .engine()
        .generate(&GenerateRequest::new("What database do we use?"))
        .await
        .unwrap();

    // The lunch message is orthogonal to the query and is filtered out.
    assert_eq!(result.citations.len(), 2);
    assert_eq!(result.references.len(), 2);
    assert!(result.response.starts_with("refs=2 persona=false"));

    let ids: Vec<&str> = result.citations.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cite_1", "cite_2"]);
    for (c, r) in result.citations.iter().zip(result.references.iter()) {
        assert_eq!(r.citation_id, c.id);
        assert!(c.similarity_score >= 0.22);
    }

    let postgres = result
        .citations
        .iter()
        .find(|c| c.preview_text == "We use Postgres for the main database")
        .unwrap();
    assert_eq!(postgres.message_id, "1");
    assert_eq!(postgres.metadata.channel_name.as_deref(), Some("backend"));
    assert_eq!(postgres.metadata.user_name, "ada");

    let dm = result
        .citations
        .iter()
        .find(|c| c.metadata.is_direct_message)
        .unwrap();
    assert_eq!(dm.metadata.receiver_name.as_deref(), Some("ada"));
    assert_eq!(dm.metadata.user_name, "grace");
}

#[tokio::test]
async fn test_unrelated_question_yields_no_citations() {
    let (backends, _) = memory_backends();
    ingest_export(&backends, &sample_export(), 10).await.unwrap();

    let result = backends
        .engine()
        .generate(&GenerateRequest::new("Who won the match?"))
        .await
        .unwrap();

    assert!(result.citations.is_empty());
    assert!(result.references.is_empty());
    assert!(result.response.starts_with("refs=0"));
}

#[tokio::test]
async fn test_failed_messages_are_counted_not_fatal() {
    let backends = Backends::from_parts(
        Arc::new(KeywordEmbedder),
        Arc::new(UnreachableIndex),
        Arc::new(CountingCompletion),
        "messages",
    );
    let stats = ingest_export(&backends, &sample_export(), 100).await.unwrap();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.failed, 3);
}

#[tokio::test]
async fn test_unreachable_index_is_a_search_error() {
    let backends = Backends::from_parts(
        Arc::new(KeywordEmbedder),
        Arc::new(UnreachableIndex),
        Arc::new(CountingCompletion),
        "messages",
    );
    let err = backends
        .engine()
        .generate(&GenerateRequest::new("database?"))
        .await
        .unwrap_err();
    assert!(matches!(err, RecallError::Search(_)));
}

#[tokio::test]
async fn test_upsert_message_requires_message_id() {
    let (backends, index) = memory_backends();
    let err = upsert_message(
        backends.embedder.as_ref(),
        backends.index.as_ref(),
        "messages",
        "hello",
        Map::new(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("message_id"));
    assert!(index.is_empty("messages"));
}

#[tokio::test]
async fn test_disabled_config_fails_with_embedding_error() {
    let config = parse_config("").unwrap();
    let backends = Backends::from_config(&config).unwrap();
    let err = backends
        .engine()
        .generate(&GenerateRequest::new("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, RecallError::Embedding(_)));
}

// ─── HTTP server ────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_upsert_then_chat() {
    let (backends, index) = memory_backends();
    let base = spawn_server(backends).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chat/upsert-message", base))
        .json(&json!({
            "message": "We use Postgres for the main database",
            "metadata": {
                "message_id": "42",
                "user_id": "u1",
                "user_name": "ada",
                "timestamp": "2024-05-01T10:00:00Z",
                "message_type": "channel",
                "channel_id": "c1",
                "channel_name": "backend"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["id"], "msg_42");
    assert_eq!(index.len("messages"), 1);

    let resp = client
        .post(format!("{}/api/chat", base))
        .json(&json!({
            "message": "What database do we use?",
            "persona": "Answer like a pirate."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("refs=1 persona=true"));
    assert_eq!(body["citations"][0]["id"], "cite_1");
    assert_eq!(body["citations"][0]["messageId"], "42");
    assert_eq!(
        body["citations"][0]["previewText"],
        "We use Postgres for the main database"
    );
    assert_eq!(body["citations"][0]["metadata"]["channelName"], "backend");
    assert_eq!(body["citations"][0]["metadata"]["isDirectMessage"], false);
    assert_eq!(
        body["references"],
        json!([{"citationId": "cite_1", "inlinePosition": 1, "referenceText": "1"}])
    );
}

#[tokio::test]
async fn test_http_threshold_override() {
    let (backends, _) = memory_backends();
    ingest_export(&backends, &sample_export(), 10).await.unwrap();
    let base = spawn_server(backends).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "database", "threshold": 0.99 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["citations"].as_array().unwrap().len(), 0);
    assert_eq!(body["references"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_http_error_codes() {
    let (backends, _) = memory_backends();
    let base = spawn_server(backends).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chat", base))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/api/chat/upsert-message", base))
        .json(&json!({ "message": "hi", "metadata": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let failing = Backends::from_parts(
        Arc::new(KeywordEmbedder),
        Arc::new(UnreachableIndex),
        Arc::new(CountingCompletion),
        "messages",
    );
    let failing_base = spawn_server(failing).await;
    let resp = client
        .post(format!("{}/api/chat", failing_base))
        .json(&json!({ "message": "database?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "search_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_http_upsert_rejects_unusable_message_ids() {
    let (backends, index) = memory_backends();
    let base = spawn_server(backends).await;
    let client = reqwest::Client::new();

    for id in [Value::Null, json!(""), json!(false), json!({"id": 1})] {
        let resp = client
            .post(format!("{}/api/chat/upsert-message", base))
            .json(&json!({ "message": "hi", "metadata": { "message_id": id.clone() } }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "message_id {}", id);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
    assert!(index.is_empty("messages"));

    let resp = client
        .post(format!("{}/api/chat/upsert-message", base))
        .json(&json!({ "message": "hi", "metadata": { "message_id": 7 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], "msg_7");
}

#[tokio::test]
async fn test_http_malformed_bodies_are_bad_requests() {
    let (backends, _) = memory_backends();
    let base = spawn_server(backends).await;
    let client = reqwest::Client::new();

    let cases = [
        ("/api/chat", json!({ "msg": "hi" })),
        ("/api/chat", json!({ "message": "hi", "top_k": -1 })),
        ("/api/chat", json!({ "message": 42 })),
        ("/api/chat/upsert-message", json!({ "metadata": { "message_id": "1" } })),
    ];
    for (path, payload) in cases {
        let resp = client
            .post(format!("{}{}", base, path))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{} {}", path, payload);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    }

    let resp = client
        .post(format!("{}/api/chat", base))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_http_health() {
    let (backends, _) = memory_backends();
    let base = spawn_server(backends).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}
