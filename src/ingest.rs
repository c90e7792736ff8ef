//! Message ingestion into the similarity index.
//!
//! Two entry points share the same write path:
//! - [`upsert_message`] embeds and stores one message whose metadata the
//!   caller already built (used by `POST /api/chat/upsert-message`).
//! - [`run_ingest`] batch-loads a JSON chat export, resolves user and
//!   channel names, and upserts every message (used by `recall ingest`).
//!
//! A failed message is counted and logged; it does not stop the batch.
//!
//! # Export format
//!
//! ```json
//! {
//!   "messages": [
//!     { "id": 1, "content": "We use Postgres", "user_id": "u1",
//!       "created_at": "2024-05-01T10:00:00Z", "is_direct_message": false,
//!       "channel_id": "c1" }
//!   ],
//!   "users":    [ { "id": "u1", "username": "ada" } ],
//!   "channels": [ { "id": "c1", "name": "backend" } ]
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chat_recall_core::embedding::Embedder;
use chat_recall_core::index::{vector_id, IndexedMessage, MessageIndex};
use chat_recall_core::models::{
    MessageKind, KEY_CHANNEL_ID, KEY_CHANNEL_NAME, KEY_MESSAGE_ID, KEY_MESSAGE_TYPE,
    KEY_RECEIVER_ID, KEY_RECEIVER_NAME, KEY_TIMESTAMP, KEY_USER_ID, KEY_USER_NAME,
    UNKNOWN_CHANNEL, UNKNOWN_USER,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::backends::Backends;
use crate::config::Config;

/// Default number of messages per ingestion batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Pause between batches to stay under provider rate limits.
const BATCH_PAUSE: Duration = Duration::from_millis(100);

/// A full chat export.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatExport {
    #[serde(default)]
    pub messages: Vec<ExportMessage>,
    #[serde(default)]
    pub users: Vec<ExportUser>,
    #[serde(default)]
    pub channels: Vec<ExportChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportMessage {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub content: String,
    #[serde(deserialize_with = "id_text")]
    pub user_id: String,
    pub created_at: String,
    #[serde(default)]
    pub is_direct_message: bool,
    #[serde(default, deserialize_with = "opt_id_text")]
    pub channel_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_text")]
    pub receiver_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportUser {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportChannel {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub name: String,
}

/// Ids appear as strings or integers depending on the exporting database.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    RawId::deserialize(d).map(String::from)
}

fn opt_id_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(d).map(|id| id.map(String::from))
}

/// Outcome of a batch ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestStats {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Build the index metadata for one exported message.
///
/// Names are resolved from the export's user and channel lists, falling
/// back to `"Unknown User"` / `"Unknown Channel"`.
pub fn build_metadata(
    message: &ExportMessage,
    user_names: &HashMap<&str, &str>,
    channel_names: &HashMap<&str, &str>,
) -> Map<String, Value> {
    let user_name = |id: &str| {
        user_names
            .get(id)
            .copied()
            .unwrap_or(UNKNOWN_USER)
            .to_string()
    };

    let mut metadata = Map::new();
    metadata.insert(KEY_MESSAGE_ID.into(), Value::String(message.id.clone()));
    metadata.insert(KEY_USER_ID.into(), Value::String(message.user_id.clone()));
    metadata.insert(KEY_USER_NAME.into(), Value::String(user_name(&message.user_id)));
    metadata.insert(KEY_TIMESTAMP.into(), Value::String(message.created_at.clone()));

    if message.is_direct_message {
        let receiver_id = message.receiver_id.clone().unwrap_or_default();
        metadata.insert(
            KEY_MESSAGE_TYPE.into(),
            Value::String(MessageKind::DirectMessage.as_str().to_string()),
        );
        metadata.insert(KEY_RECEIVER_NAME.into(), Value::String(user_name(&receiver_id)));
        metadata.insert(KEY_RECEIVER_ID.into(), Value::String(receiver_id));
    } else {
        let channel_id = message.channel_id.clone().unwrap_or_default();
        let channel_name = channel_names
            .get(channel_id.as_str())
            .copied()
            .unwrap_or(UNKNOWN_CHANNEL)
            .to_string();
        metadata.insert(
            KEY_MESSAGE_TYPE.into(),
            Value::String(MessageKind::Channel.as_str().to_string()),
        );
        metadata.insert(KEY_CHANNEL_NAME.into(), Value::String(channel_name));
        metadata.insert(KEY_CHANNEL_ID.into(), Value::String(channel_id));
    }

    metadata
}

/// The `message_id` a vector id is derived from: a non-empty string or a
/// number. Anything else (missing, null, empty, bool, object) is `None`.
pub fn message_id_of(metadata: &Map<String, Value>) -> Option<String> {
    match metadata.get(KEY_MESSAGE_ID) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Embed `content` and upsert it under `msg_<message_id>`.
///
/// Returns the vector id. `metadata` must carry a `message_id`.
pub async fn upsert_message(
    embedder: &dyn Embedder,
    index: &dyn MessageIndex,
    namespace: &str,
    content: &str,
    metadata: Map<String, Value>,
) -> Result<String> {
    if content.trim().is_empty() {
        bail!("message must not be empty");
    }
    let Some(message_id) = message_id_of(&metadata) else {
        bail!("metadata.message_id is required");
    };

    let vector = embedder
        .embed(content)
        .await
        .with_context(|| format!("embedding message {}", message_id))?;
    let message = IndexedMessage {
        id: vector_id(&message_id),
        content: content.to_string(),
        metadata,
        vector,
    };
    index
        .upsert(namespace, &message)
        .await
        .with_context(|| format!("upserting {}", message.id))?;

    info!(id = %message.id, namespace, "upserted message");
    Ok(message.id)
}

/// Ingest every message in `export`, `batch_size` at a time.
pub async fn ingest_export(
    backends: &Backends,
    export: &ChatExport,
    batch_size: usize,
) -> Result<IngestStats> {
    if batch_size == 0 {
        bail!("batch size must be >= 1");
    }

    let started_at = Utc::now();
    let user_names: HashMap<&str, &str> = export
        .users
        .iter()
        .map(|u| (u.id.as_str(), u.username.as_str()))
        .collect();
    let channel_names: HashMap<&str, &str> = export
        .channels
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let total = export.messages.len();
    let total_batches = total.div_ceil(batch_size);
    info!(total, total_batches, "ingesting messages");

    let mut successful = 0;
    let mut failed = 0;

    for (batch_idx, batch) in export.messages.chunks(batch_size).enumerate() {
        let batch_started = Utc::now();

        for message in batch {
            let metadata = build_metadata(message, &user_names, &channel_names);
            match upsert_message(
                backends.embedder.as_ref(),
                backends.index.as_ref(),
                &backends.namespace,
                &message.content,
                metadata,
            )
            .await
            {
                Ok(_) => successful += 1,
                Err(e) => {
                    error!(message_id = %message.id, error = %format!("{:#}", e), "failed to ingest message");
                    failed += 1;
                }
            }
        }

        info!(
            batch = batch_idx + 1,
            total_batches,
            elapsed_ms = (Utc::now() - batch_started).num_milliseconds(),
            "batch complete"
        );
        if batch_idx + 1 < total_batches {
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }

    Ok(IngestStats {
        total_processed: successful + failed,
        successful,
        failed,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Load a chat export from disk.
pub fn load_export(path: &Path) -> Result<ChatExport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read export file: {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow!("Failed to parse export file {}: {}", path.display(), e))
}

/// `recall ingest`: load an export and push it into the configured index.
pub async fn run_ingest(config: &Config, path: &Path, batch_size: usize) -> Result<()> {
    if config.index.provider == "memory" {
        tracing::warn!("index provider is 'memory': ingested messages are discarded on exit");
    }
    let export = load_export(path)?;
    let backends = Backends::from_config(config)?;
    let stats = ingest_export(&backends, &export, batch_size).await?;

    println!("ingest {}", path.display());
    println!("  total processed: {}", stats.total_processed);
    println!("  successful: {}", stats.successful);
    println!("  failed: {}", stats.failed);
    println!("  duration: {:.2}s", stats.duration_secs());

    Ok(())
}
