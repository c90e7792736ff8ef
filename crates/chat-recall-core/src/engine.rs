//! The retrieval-augmented response engine.
//!
//! A single linear pipeline per request:
//!
//! 1. Embed the user message ([`Embedder`]).
//! 2. Fetch up to `top_k` similar messages from the namespace ([`SimilaritySearch`]).
//! 3. Drop matches below the threshold ([`filter_relevant`]).
//! 4. Number the survivors and build citations ([`assemble_references`]).
//! 5. Compose the system instruction and generate ([`Completion`]).
//! 6. Package text and citations into a [`ChatResult`].
//!
//! There are no retries and no intermediate state. A failure at any step
//! aborts the call with the matching [`RecallError`] variant; a partial
//! result is never returned.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::completion::Completion;
use crate::embedding::Embedder;
use crate::error::{RecallError, RecallResult};
use crate::index::{SearchRequest, SimilaritySearch};
use crate::models::ChatResult;
use crate::prompt::compose_system_prompt;
use crate::references::{assemble_references, ReferenceSet};
use crate::relevance::{filter_relevant, DEFAULT_SIMILARITY_THRESHOLD};

/// Number of similar messages fetched when the caller does not say.
pub const DEFAULT_TOP_K: usize = 5;

/// Namespace that chat messages are indexed under.
pub const DEFAULT_NAMESPACE: &str = "messages";

/// Inputs for one [`ResponseEngine::generate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub message: String,
    pub top_k: usize,
    pub threshold: f64,
    /// Persona or extra instructions appended to the system instruction.
    pub persona: Option<String>,
}

impl GenerateRequest {
    /// A request with the default `top_k`, threshold, and no persona.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            persona: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    fn validate(&self) -> RecallResult<()> {
        if self.message.trim().is_empty() {
            return Err(RecallError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(RecallError::InvalidRequest("top_k must be >= 1".to_string()));
        }
        if !self.threshold.is_finite() {
            return Err(RecallError::InvalidRequest(
                "threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pair the generated text with the citations that grounded it.
///
/// The text is returned exactly as generated.
pub fn package(response: String, references: ReferenceSet) -> ChatResult {
    ChatResult {
        response,
        citations: references.citations,
        references: references.references,
    }
}

/// Retrieval-augmented response engine.
///
/// Holds its three collaborators as injected trait objects and no other
/// state, so one engine can serve any number of concurrent requests and is
/// cheap to clone into request handlers.
#[derive(Clone)]
pub struct ResponseEngine {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn SimilaritySearch>,
    completion: Arc<dyn Completion>,
    namespace: String,
}

impl ResponseEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn SimilaritySearch>,
        completion: Arc<dyn Completion>,
    ) -> Self {
        Self {
            embedder,
            search,
            completion,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Search a different index namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Generate a grounded, citation-carrying response to `req.message`.
    ///
    /// No relevant matches is a success with empty citations; the generator
    /// is still called, without a references section.
    pub async fn generate(&self, req: &GenerateRequest) -> RecallResult<ChatResult> {
        req.validate()?;

        let query_vec = self
            .embedder
            .embed(&req.message)
            .await
            .map_err(RecallError::Embedding)?;
        debug!(
            model = self.embedder.model_name(),
            dims = query_vec.len(),
            "embedded query"
        );

        let search_req = SearchRequest {
            query: &req.message,
            query_vec: &query_vec,
            top_k: req.top_k,
            namespace: &self.namespace,
        };
        let mut matches = self
            .search
            .search(&search_req)
            .await
            .map_err(RecallError::Search)?;
        if matches.len() > req.top_k {
            warn!(
                returned = matches.len(),
                top_k = req.top_k,
                "search backend exceeded top_k, truncating"
            );
            matches.truncate(req.top_k);
        }

        let retrieved = matches.len();
        let relevant = filter_relevant(matches, req.threshold);
        let references = assemble_references(&relevant);
        info!(
            namespace = %self.namespace,
            retrieved,
            relevant = references.len(),
            threshold = req.threshold,
            "assembled grounding references"
        );

        let system = compose_system_prompt(&references.lines, req.persona.as_deref());
        let response = self
            .completion
            .complete(&system, &req.message)
            .await
            .map_err(RecallError::Generation)?;
        debug!(
            model = self.completion.model_name(),
            chars = response.len(),
            "generated response"
        );

        Ok(package(response, references))
    }
}
