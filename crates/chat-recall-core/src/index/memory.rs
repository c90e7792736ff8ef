//! In-memory [`MessageIndex`] implementation for tests and local runs.
//!
//! Uses a `HashMap` of namespaces behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every vector in the namespace.
//!
//! Scores are computed in `f32` and widened to `f64`, so they carry `f32`
//! precision: a cosine of exactly `0.22` may compare as `0.2199999988`
//! against the relevance threshold.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{IndexedMessage, MessageIndex, SearchRequest, SimilaritySearch};
use crate::embedding::cosine_similarity;
use crate::models::SimilarityMatch;

/// In-memory, namespace-partitioned message index.
#[derive(Default)]
pub struct InMemoryIndex {
    namespaces: RwLock<HashMap<String, Vec<IndexedMessage>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages stored in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .map(|ns| ns.get(namespace).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

#[async_trait]
impl SimilaritySearch for InMemoryIndex {
    async fn search(&self, req: &SearchRequest<'_>) -> Result<Vec<SimilarityMatch>> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        let Some(messages) = namespaces.get(req.namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<SimilarityMatch> = messages
            .iter()
            .map(|m| SimilarityMatch {
                content: m.content.clone(),
                metadata: m.metadata.clone(),
                similarity_score: cosine_similarity(req.query_vec, &m.vector) as f64,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(req.top_k);
        Ok(matches)
    }
}

#[async_trait]
impl MessageIndex for InMemoryIndex {
    async fn upsert(&self, namespace: &str, message: &IndexedMessage) -> Result<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        let stored = namespaces.entry(namespace.to_string()).or_default();
        stored.retain(|m| m.id != message.id);
        stored.push(message.clone());
        Ok(())
    }
}
