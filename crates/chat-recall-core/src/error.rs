//! Failure taxonomy for the response engine.

use thiserror::Error;

/// Why a `generate` call produced no result.
///
/// Each collaborator failure keeps its own variant so callers can tell a
/// retrieval outage apart from a generation outage. "Nothing relevant was
/// found" is not an error: it is a successful result with no citations.
#[derive(Debug, Error)]
pub enum RecallError {
    /// The request was rejected before any collaborator was called.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("embedding failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    #[error("similarity search failed: {0:#}")]
    Search(#[source] anyhow::Error),

    #[error("response generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),
}

impl RecallError {
    /// Stable machine-readable code for this failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RecallError::InvalidRequest(_) => "bad_request",
            RecallError::Embedding(_) => "embedding_error",
            RecallError::Search(_) => "search_error",
            RecallError::Generation(_) => "generation_error",
        }
    }
}

pub type RecallResult<T> = std::result::Result<T, RecallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            RecallError::InvalidRequest("x".into()).kind(),
            RecallError::Embedding(anyhow::anyhow!("x")).kind(),
            RecallError::Search(anyhow::anyhow!("x")).kind(),
            RecallError::Generation(anyhow::anyhow!("x")).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_display_includes_source_chain() {
        let err = RecallError::Search(
            anyhow::anyhow!("connection refused").context("pinecone query"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("similarity search failed"));
        assert!(msg.contains("pinecone query"));
        assert!(msg.contains("connection refused"));
    }
}
