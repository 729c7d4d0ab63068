//! # askdocs core
//!
//! Shared, I/O-free logic for askdocs: data models, token counting,
//! recursive chunking, distance metrics, context assembly, the prompt
//! template, conversation history, and the question-answering
//! orchestration that ties them together.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem code. Embedding
//! and completion backends are injected through the [`provider`] traits,
//! so every algorithm here can be exercised with deterministic test doubles.

pub mod answer;
pub mod chunk;
pub mod context;
pub mod conversation;
pub mod distance;
pub mod embedding;
pub mod error;
pub mod models;
pub mod prompt;
pub mod provider;
pub mod tokenizer;
