//! `recall ask`: one-shot grounded answer from the command line.

use anyhow::Result;
use chat_recall_core::engine::GenerateRequest;
use chat_recall_core::markers::unresolved_markers;
use chat_recall_core::models::ChatResult;

use crate::backends::Backends;
use crate::config::Config;

/// Options for a single `ask` invocation. `None` falls back to `[retrieval]`.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f64>,
    pub persona: Option<String>,
    pub json: bool,
}

pub async fn run_ask(config: &Config, message: &str, opts: AskOptions) -> Result<()> {
    let backends = Backends::from_config(config)?;
    let engine = backends.engine();

    let req = GenerateRequest {
        message: message.to_string(),
        top_k: opts.top_k.unwrap_or(config.retrieval.top_k),
        threshold: opts
            .threshold
            .unwrap_or(config.retrieval.similarity_threshold),
        persona: opts.persona,
    };
    let result = engine.generate(&req).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_text(&result));
    }

    Ok(())
}

/// Human-readable rendering: the answer, then one line per citation.
pub fn render_text(result: &ChatResult) -> String {
    let mut out = String::new();
    out.push_str(&result.response);
    out.push('\n');

    if !result.citations.is_empty() {
        out.push_str("\nSources:\n");
        for (citation, reference) in result.citations.iter().zip(result.references.iter()) {
            let place = match (&citation.metadata.channel_name, &citation.metadata.receiver_name) {
                (Some(channel), _) => format!("#{}", channel),
                (None, Some(receiver)) => format!("DM to {}", receiver),
                (None, None) => "DM".to_string(),
            };
            out.push_str(&format!(
                "  [{}] {} in {} ({:.2}): {}\n",
                reference.reference_text,
                citation.metadata.user_name,
                place,
                citation.similarity_score,
                citation.preview_text
            ));
        }
    }

    let dangling = unresolved_markers(result);
    if !dangling.is_empty() {
        let list: Vec<String> = dangling.iter().map(|n| n.to_string()).collect();
        out.push_str(&format!(
            "\nwarning: response cites unknown references: {}\n",
            list.join(", ")
        ));
    }

    out
}
