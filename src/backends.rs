//! Wiring of configured backends into a [`ResponseEngine`].
//!
//! The index backend is shared between the engine (read side) and
//! ingestion (write side), so both see the same data when the in-memory
//! provider is used.

use anyhow::{bail, Result};
use chat_recall_core::completion::Completion;
use chat_recall_core::embedding::Embedder;
use chat_recall_core::engine::ResponseEngine;
use chat_recall_core::index::memory::InMemoryIndex;
use chat_recall_core::index::{MessageIndex, SimilaritySearch};
use std::sync::Arc;
use tracing::info;

use crate::completion::create_completion;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::pinecone::PineconeIndex;

/// The collaborators selected by a [`Config`].
#[derive(Clone)]
pub struct Backends {
    pub embedder: Arc<dyn Embedder>,
    pub search: Arc<dyn SimilaritySearch>,
    pub index: Arc<dyn MessageIndex>,
    pub completion: Arc<dyn Completion>,
    pub namespace: String,
}

impl Backends {
    /// Instantiate every backend named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let completion = create_completion(&config.completion)?;

        let (search, index): (Arc<dyn SimilaritySearch>, Arc<dyn MessageIndex>) =
            match config.index.provider.as_str() {
                "memory" => {
                    let memory = Arc::new(InMemoryIndex::new());
                    (
                        memory.clone() as Arc<dyn SimilaritySearch>,
                        memory as Arc<dyn MessageIndex>,
                    )
                }
                "pinecone" => {
                    let pinecone = Arc::new(PineconeIndex::new(&config.index)?);
                    (
                        pinecone.clone() as Arc<dyn SimilaritySearch>,
                        pinecone as Arc<dyn MessageIndex>,
                    )
                }
                other => bail!("Unknown index provider: {}", other),
            };

        info!(
            embedding = embedder.model_name(),
            completion = completion.model_name(),
            index = %config.index.provider,
            namespace = %config.retrieval.namespace,
            "backends ready"
        );

        Ok(Self {
            embedder,
            search,
            index,
            completion,
            namespace: config.retrieval.namespace.clone(),
        })
    }

    /// Assemble backends from already-constructed parts, sharing one index
    /// for reads and writes.
    pub fn from_parts<I>(
        embedder: Arc<dyn Embedder>,
        index: Arc<I>,
        completion: Arc<dyn Completion>,
        namespace: impl Into<String>,
    ) -> Self
    where
        I: MessageIndex + 'static,
    {
        Self {
            embedder,
            search: index.clone(),
            index,
            completion,
            namespace: namespace.into(),
        }
    }

    pub fn engine(&self) -> ResponseEngine {
        ResponseEngine::new(
            self.embedder.clone(),
            self.search.clone(),
            self.completion.clone(),
        )
        .with_namespace(self.namespace.clone())
    }
}
