//! Core data models shared by the engine, adapters, and HTTP layer.
//!
//! A request flows through these types in order:
//!
//! ```text
//! SimilarityMatch ──filter──▶ SimilarityMatch ──assemble──▶ Citation + Reference
//!                                                               │
//!                                               response text ──┴──▶ ChatResult
//! ```
//!
//! Everything here is created per request and dropped once the caller has
//! the [`ChatResult`]. The citation types serialize in camelCase because that
//! is the shape chat clients render citations from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding the stored message id.
pub const KEY_MESSAGE_ID: &str = "message_id";
/// Metadata key holding the author's user id.
pub const KEY_USER_ID: &str = "user_id";
/// Metadata key holding the author's display name.
pub const KEY_USER_NAME: &str = "user_name";
/// Metadata key holding the message creation time.
pub const KEY_TIMESTAMP: &str = "timestamp";
/// Metadata key holding the conversation type (`"channel"` or a DM marker).
pub const KEY_MESSAGE_TYPE: &str = "message_type";
pub const KEY_CHANNEL_ID: &str = "channel_id";
pub const KEY_CHANNEL_NAME: &str = "channel_name";
pub const KEY_RECEIVER_ID: &str = "receiver_id";
pub const KEY_RECEIVER_NAME: &str = "receiver_name";

/// Fallback rendered when a channel message has no `channel_name`.
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
/// Fallback rendered when a user or receiver name is missing.
pub const UNKNOWN_USER: &str = "Unknown User";

/// A candidate prior message returned by a similarity search backend.
///
/// Matches arrive ordered by descending similarity; nothing downstream
/// re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Full text of the stored message.
    pub content: String,
    /// Provenance recorded at ingestion time (see the `KEY_*` constants).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Similarity to the query as reported by the index metric.
    pub similarity_score: f64,
}

impl SimilarityMatch {
    pub fn new(content: impl Into<String>, metadata: Map<String, Value>, score: f64) -> Self {
        Self {
            content: content.into(),
            metadata,
            similarity_score: score,
        }
    }

    /// Read a metadata field as text.
    ///
    /// Strings are returned as-is, numbers and booleans in their JSON text
    /// form. `null` and absent keys yield `None`.
    pub fn meta_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Conversation type of the stored message.
    pub fn kind(&self) -> MessageKind {
        MessageKind::from_metadata(self.metadata.get(KEY_MESSAGE_TYPE))
    }
}

/// Where a stored message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Channel,
    DirectMessage,
}

impl MessageKind {
    /// Only the literal `"channel"` marks a channel message. Ingestion
    /// writes `"dm"` for direct messages, and anything unrecognised is
    /// treated the same way.
    pub fn from_metadata(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("channel") => MessageKind::Channel,
            _ => MessageKind::DirectMessage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Channel => "channel",
            MessageKind::DirectMessage => "dm",
        }
    }
}

/// Machine-readable record of a retrieved message surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Ordinal-keyed id, `cite_<N>`.
    pub id: String,
    pub message_id: String,
    pub similarity_score: f64,
    /// First 100 characters of the message content.
    pub preview_text: String,
    pub metadata: CitationMetadata,
}

/// Provenance of a cited message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationMetadata {
    pub timestamp: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    pub is_direct_message: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
}

/// Lightweight ordinal record used to map inline `{ref:N}` markers back to
/// a [`Citation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub citation_id: String,
    pub inline_position: usize,
    /// The ordinal in decimal form (`"1"`, `"2"`, …).
    pub reference_text: String,
}

/// The unit returned to the caller: generated text plus the citations that
/// grounded it.
///
/// `citations` and `references` always have the same length and are index
/// aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub response: String,
    pub citations: Vec<Citation>,
    pub references: Vec<Reference>,
}
