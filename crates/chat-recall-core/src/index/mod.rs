//! Similarity index abstraction.
//!
//! The [`SimilaritySearch`] trait is the read side used by the response
//! engine. [`MessageIndex`] adds the write side used only by ingestion, so
//! the engine can be handed a search-only backend.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::SimilarityMatch;

/// Bundles all inputs for a single similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    /// Raw query text, for backends that embed internally.
    pub query: &'a str,
    /// Pre-computed query embedding.
    pub query_vec: &'a [f32],
    /// Maximum number of matches to return.
    pub top_k: usize,
    /// Index partition to search (e.g. `"messages"`).
    pub namespace: &'a str,
}

/// A message ready to be written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedMessage {
    /// Vector id, `msg_<message_id>`.
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub vector: Vec<f32>,
}

/// Vector id under which a message is stored.
pub fn vector_id(message_id: &str) -> String {
    format!("msg_{}", message_id)
}

/// Read side of a namespace-scoped vector index.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return at most `req.top_k` matches from `req.namespace`, ordered by
    /// descending similarity.
    async fn search(&self, req: &SearchRequest<'_>) -> Result<Vec<SimilarityMatch>>;
}

/// Write side of a namespace-scoped vector index.
#[async_trait]
pub trait MessageIndex: SimilaritySearch {
    /// Insert or replace a message by its vector id.
    async fn upsert(&self, namespace: &str, message: &IndexedMessage) -> Result<()>;
}
