//! # Chat Recall
//!
//! Retrieval-augmented chat responses with verifiable citations.
//!
//! A user message is embedded, similar prior messages are fetched from a
//! namespace-scoped vector index, the relevant ones are numbered and handed
//! to a chat model that cites them inline as `{ref:N}`, and the caller gets
//! the answer back together with the matching citation records.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────┐   ┌────────────┐
//! │ chat export│──▶│ ingest: embed + upsert   │──▶│  Pinecone  │
//! └────────────┘   └──────────────────────────┘   │  / memory  │
//!                                                 └─────┬──────┘
//!                   ┌──────────────────────────┐        │
//!   message ───────▶│ ResponseEngine (core)    │◀───────┘
//!                   │ filter · assemble · cite │──▶ OpenAI chat
//!                   └───────────┬──────────────┘
//!                               ▼
//!                      CLI (recall) · HTTP
//! ```
//!
//! The pipeline itself lives in the `chat-recall-core` crate; this crate
//! supplies configuration, concrete backends, ingestion, and the outer
//! surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`http`] | Shared HTTP client, retry and backoff |
//! | [`embedding`] | OpenAI / Ollama embedding backends |
//! | [`completion`] | OpenAI chat-completion backend |
//! | [`pinecone`] | Pinecone similarity index backend |
//! | [`backends`] | Config → engine wiring |
//! | [`ingest`] | Message upsert and chat export ingestion |
//! | [`ask`] | One-shot CLI answers |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod backends;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod pinecone;
pub mod server;
