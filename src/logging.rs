//! Tracing subscriber setup for the `recall` binary.
//!
//! Logs go to stderr so that command output on stdout (answers, JSON,
//! ingestion stats) stays pipeable. Filtering follows `RUST_LOG`, falling
//! back to [`DEFAULT_FILTER`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "chat_recall=info,chat_recall_core=info,tower_http=info";

/// Install the global subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
