//! Pinecone data-plane adapter.
//!
//! Implements the core [`SimilaritySearch`] and [`MessageIndex`] traits
//! against a Pinecone index host:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | search | `POST {host}/query` |
//! | upsert | `POST {host}/vectors/upsert` |
//!
//! Message text is stored in the vector's metadata under [`TEXT_KEY`],
//! alongside the provenance fields written at ingestion. Index creation
//! and namespace provisioning are managed outside this crate.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chat_recall_core::index::{IndexedMessage, MessageIndex, SearchRequest, SimilaritySearch};
use chat_recall_core::models::SimilarityMatch;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::IndexConfig;
use crate::http::{client, post_json_with_retry};

/// Metadata key holding the message text.
pub const TEXT_KEY: &str = "text";

const API_VERSION: &str = "2024-07";
const MAX_RETRIES: u32 = 3;

/// Client for one Pinecone index. Requires `PINECONE_API_KEY`.
pub struct PineconeIndex {
    host: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let host = config
            .host
            .clone()
            .ok_or_else(|| anyhow!("index.host required for Pinecone provider"))?;
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| anyhow!("PINECONE_API_KEY environment variable not set"))?;

        Ok(Self {
            host: normalize_host(&host),
            api_key,
            client: client(config.timeout_secs)?,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.host, path);
        post_json_with_retry("Pinecone", MAX_RETRIES, || {
            self.client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(body)
        })
        .await
    }
}

/// Prefix bare hostnames with `https://` and drop trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Body for `POST /query`.
pub fn query_body(req: &SearchRequest<'_>) -> Value {
    json!({
        "vector": req.query_vec,
        "topK": req.top_k,
        "namespace": req.namespace,
        "includeMetadata": true,
        "includeValues": false,
    })
}

/// Body for `POST /vectors/upsert`.
pub fn upsert_body(namespace: &str, message: &IndexedMessage) -> Value {
    let mut metadata = message.metadata.clone();
    metadata.insert(TEXT_KEY.to_string(), Value::String(message.content.clone()));
    json!({
        "vectors": [{
            "id": message.id,
            "values": message.vector,
            "metadata": metadata,
        }],
        "namespace": namespace,
    })
}

/// Convert a `/query` response into matches, keeping Pinecone's order.
pub fn parse_query_response(json: &Value) -> Result<Vec<SimilarityMatch>> {
    let matches = json
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| anyhow!("Invalid Pinecone response: missing matches array"))?;

    matches
        .iter()
        .map(|m| {
            let score = m
                .get("score")
                .and_then(|s| s.as_f64())
                .ok_or_else(|| anyhow!("Invalid Pinecone response: match without score"))?;
            let mut metadata: Map<String, Value> = m
                .get("metadata")
                .and_then(|md| md.as_object())
                .cloned()
                .unwrap_or_default();
            let content = match metadata.remove(TEXT_KEY) {
                Some(Value::String(text)) => text,
                _ => String::new(),
            };
            Ok(SimilarityMatch {
                content,
                metadata,
                similarity_score: score,
            })
        })
        .collect()
}

#[async_trait]
impl SimilaritySearch for PineconeIndex {
    async fn search(&self, req: &SearchRequest<'_>) -> Result<Vec<SimilarityMatch>> {
        let json = self.post("/query", &query_body(req)).await?;
        let matches = parse_query_response(&json)?;
        debug!(namespace = req.namespace, count = matches.len(), "pinecone query");
        Ok(matches)
    }
}

#[async_trait]
impl MessageIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, message: &IndexedMessage) -> Result<()> {
        let json = self
            .post("/vectors/upsert", &upsert_body(namespace, message))
            .await?;
        debug!(
            id = %message.id,
            upserted = json.get("upsertedCount").and_then(|c| c.as_u64()).unwrap_or(0),
            "pinecone upsert"
        );
        Ok(())
    }
}
