//! Relevance filtering of similarity matches.

use crate::models::SimilarityMatch;

/// Minimum similarity a retrieved message needs to be used as grounding.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.22;

/// Keep the matches scoring at or above `threshold`, in their original order.
///
/// A NaN score never passes.
pub fn filter_relevant(matches: Vec<SimilarityMatch>, threshold: f64) -> Vec<SimilarityMatch> {
    matches
        .into_iter()
        .filter(|m| m.similarity_score >= threshold)
        .collect()
}
