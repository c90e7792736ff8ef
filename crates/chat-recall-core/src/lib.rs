//! # Chat Recall Core
//!
//! Runtime-agnostic logic for Chat Recall: the citation data model, the
//! relevance filter, reference assembly, system-instruction composition,
//! the capability traits for embedding, similarity search and completion,
//! and the [`ResponseEngine`](engine::ResponseEngine) that ties them
//! together.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Concrete backends live in the `chat-recall`
//! app crate; tests inject fakes through the same traits.
//!
//! ```text
//! message ─▶ Embedder ─▶ SimilaritySearch ─▶ filter_relevant ─▶ assemble_references
//!                                                                      │
//!        ChatResult ◀─ package ◀─ Completion ◀─ compose_system_prompt ◀┘
//! ```

pub mod completion;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod markers;
pub mod models;
pub mod prompt;
pub mod references;
pub mod relevance;
