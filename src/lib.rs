//! # corpus-chat
//!
//! A retrieval-augmented conversational assistant grounded in a folder of
//! PDF documents.
//!
//! At startup the corpus is turned into a searchable knowledge base; at
//! query time each question is resolved against the conversation so far,
//! matched to the most relevant chunks, and answered by a language model
//! constrained to those chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ PDF folder │──▶│ Extract+Chunk │──▶│ Embedding index │   (build, once)
//! └────────────┘   └──────────────┘   └───────┬────────┘
//!                                             │
//!            question ──▶ contextualize ──▶ retrieve ──▶ grounded answer
//!                │                                            │
//!                └──────────── conversation memory ◀──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`corpus`] | PDF folder scanning |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector index and top-k search |
//! | [`memory`] | Bounded conversation window |
//! | [`llm`] | Language-model provider abstraction |
//! | [`answer`] | Two-stage grounded answering |
//! | [`controller`] | Per-session orchestration |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod controller;
pub mod corpus;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod memory;
pub mod models;

#[cfg(test)]
mod testutil;
