//! Reference assembly: numbering relevant matches and building citations.
//!
//! Every match that survived the relevance filter gets a dense 1-based
//! ordinal `N`. That ordinal appears in three places which must always
//! agree:
//!
//! | Output | Form |
//! |--------|------|
//! | reference line | `Reference [N] (from #channel): …` |
//! | [`Citation::id`] | `cite_N` |
//! | [`Reference`] | `{ citationId: "cite_N", inlinePosition: N, referenceText: "N" }` |
//!
//! The three lists are built in a single pass, so they can never drift
//! apart or be reordered independently.

use crate::models::{
    Citation, CitationMetadata, MessageKind, Reference, SimilarityMatch, KEY_CHANNEL_ID,
    KEY_CHANNEL_NAME, KEY_MESSAGE_ID, KEY_RECEIVER_ID, KEY_RECEIVER_NAME, KEY_TIMESTAMP,
    KEY_USER_ID, KEY_USER_NAME, UNKNOWN_CHANNEL, UNKNOWN_USER,
};

/// Maximum number of characters kept in [`Citation::preview_text`].
pub const PREVIEW_CHARS: usize = 100;

/// The assembled grounding context for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    /// Human-readable reference lines, in ordinal order.
    pub lines: Vec<String>,
    pub citations: Vec<Citation>,
    pub references: Vec<Reference>,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }
}

/// Citation id for an ordinal.
pub fn citation_id(ordinal: usize) -> String {
    format!("cite_{}", ordinal)
}

/// First [`PREVIEW_CHARS`] characters of `content`, without any marker.
///
/// Counts characters rather than bytes, so multi-byte text is never split
/// inside a code point.
pub fn preview_text(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

/// Render the reference line shown to the generator for one match.
pub fn reference_line(ordinal: usize, m: &SimilarityMatch) -> String {
    match m.kind() {
        MessageKind::Channel => {
            let channel = m
                .meta_str(KEY_CHANNEL_NAME)
                .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());
            format!("Reference [{}] (from #{}): {}", ordinal, channel, m.content)
        }
        MessageKind::DirectMessage => format!("Reference [{}] (from DM): {}", ordinal, m.content),
    }
}

fn citation_metadata(m: &SimilarityMatch) -> CitationMetadata {
    let is_dm = m.kind() == MessageKind::DirectMessage;
    let (channel_id, channel_name, receiver_id, receiver_name) = if is_dm {
        (
            None,
            None,
            m.meta_str(KEY_RECEIVER_ID),
            Some(
                m.meta_str(KEY_RECEIVER_NAME)
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            ),
        )
    } else {
        (
            m.meta_str(KEY_CHANNEL_ID),
            Some(
                m.meta_str(KEY_CHANNEL_NAME)
                    .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
            ),
            None,
            None,
        )
    };

    CitationMetadata {
        timestamp: m.meta_str(KEY_TIMESTAMP).unwrap_or_default(),
        user_id: m.meta_str(KEY_USER_ID).unwrap_or_default(),
        user_name: m
            .meta_str(KEY_USER_NAME)
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        channel_id,
        channel_name,
        is_direct_message: is_dm,
        receiver_id,
        receiver_name,
    }
}

/// Number the relevant matches and build the reference lines, citations,
/// and references for them.
///
/// Ordinals follow the order of `relevant`, starting at 1. Output is fully
/// determined by the input.
pub fn assemble_references(relevant: &[SimilarityMatch]) -> ReferenceSet {
    let mut set = ReferenceSet {
        lines: Vec::with_capacity(relevant.len()),
        citations: Vec::with_capacity(relevant.len()),
        references: Vec::with_capacity(relevant.len()),
    };

    for (idx, m) in relevant.iter().enumerate() {
        let ordinal = idx + 1;
        let id = citation_id(ordinal);

        set.lines.push(reference_line(ordinal, m));
        set.citations.push(Citation {
            id: id.clone(),
            message_id: m.meta_str(KEY_MESSAGE_ID).unwrap_or_default(),
            similarity_score: m.similarity_score,
            preview_text: preview_text(&m.content),
            metadata: citation_metadata(m),
        });
        set.references.push(Reference {
            citation_id: id,
            inline_position: ordinal,
            reference_text: ordinal.to_string(),
        });
    }

    set
}
