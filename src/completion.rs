//! Chat-completion backends.
//!
//! - **[`DisabledCompletion`]** — returns errors; used when no generator is configured.
//! - **[`OpenAICompletion`]** — calls an OpenAI-compatible `/chat/completions` endpoint.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chat_recall_core::completion::Completion;
use serde_json::json;
use std::sync::Arc;

use crate::config::CompletionConfig;
use crate::http::{client, post_json_with_retry};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Create the completion backend selected by `config.provider`.
pub fn create_completion(config: &CompletionConfig) -> Result<Arc<dyn Completion>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledCompletion)),
        "openai" => Ok(Arc::new(OpenAICompletion::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}

/// A completion backend that always fails.
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        bail!("Completion provider is disabled")
    }
}

/// Completion backend for the OpenAI chat API and compatible servers.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAICompletion {
    model: String,
    temperature: f32,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAICompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("completion.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let base = config.url.as_deref().unwrap_or(OPENAI_API_BASE);

        Ok(Self {
            model,
            temperature: config.temperature,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            client: client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Completion for OpenAICompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = chat_request_body(&self.model, self.temperature, system, user);

        let json = post_json_with_retry("OpenAI", self.max_retries, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        parse_chat_response(&json)
    }
}

/// Request body for a two-turn chat completion.
pub fn chat_request_body(
    model: &str,
    temperature: f32,
    system: &str,
    user: &str,
) -> serde_json::Value {
    json!({
        "model": model,
        "temperature": temperature,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ],
    })
}

/// Extract `choices[0].message.content` from a chat completion response.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid completion response: missing choices[0].message.content"))
}
