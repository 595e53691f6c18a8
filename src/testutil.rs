//! Deterministic in-process fakes for the provider seams, used by unit
//! tests across modules. Real providers are external collaborators and
//! never run in tests.

use async_trait::async_trait;

use crate::embedding::{Embedder, EmbeddingError};
use crate::llm::{ChatModel, GenerationError};
use crate::models::Chunk;

pub const FAKE_DIMS: usize = 32;

/// Token-bag embedder: each lowercase token increments a slot chosen by a
/// byte-sum hash. Texts sharing words get correlated vectors, which is all
/// retrieval tests need. Tokens of one or two characters are ignored so
/// function words don't drown out content words.
pub struct HashEmbedder;

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut vec = vec![0.0f32; FAKE_DIMS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
    {
        let slot: usize = token.bytes().map(|b| b as usize).sum::<usize>() % FAKE_DIMS;
        vec[slot] += 1.0;
    }
    vec
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }
    fn dims(&self) -> usize {
        FAKE_DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

/// Embedder that always fails, for build-abort and query-failure tests.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }
    fn dims(&self) -> usize {
        FAKE_DIMS
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Transport("connection refused".to_string()))
    }
}

/// Chat model that answers the grounding prompt by echoing its context
/// block, and the contextualization prompt with a fixed rewrite. Grounded
/// answers therefore contain exactly what retrieval supplied.
pub struct ExtractiveModel {
    pub rewrite: String,
}

impl ExtractiveModel {
    pub fn new(rewrite: impl Into<String>) -> Self {
        Self {
            rewrite: rewrite.into(),
        }
    }
}

#[async_trait]
impl ChatModel for ExtractiveModel {
    fn model_name(&self) -> &str {
        "extractive-test"
    }
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, GenerationError> {
        if prompt.contains("Standalone question:") {
            return Ok(self.rewrite.clone());
        }
        let context = prompt
            .split("Context:")
            .nth(1)
            .and_then(|rest| rest.split("\nQuestion:").next())
            .unwrap_or(prompt)
            .trim()
            .to_string();
        Ok(context)
    }
}

/// Chat model that answers like [`ExtractiveModel`] a limited number of
/// times, then fails every call. Lets a test succeed on one turn and fail
/// on the next with the same controller.
pub struct FlakyModel {
    inner: ExtractiveModel,
    successes_left: std::sync::atomic::AtomicUsize,
}

impl FlakyModel {
    pub fn new(successes: usize, rewrite: impl Into<String>) -> Self {
        Self {
            inner: ExtractiveModel::new(rewrite),
            successes_left: std::sync::atomic::AtomicUsize::new(successes),
        }
    }
}

#[async_trait]
impl ChatModel for FlakyModel {
    fn model_name(&self) -> &str {
        "flaky-test"
    }
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        use std::sync::atomic::Ordering;
        let left = self.successes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(GenerationError::Transport("connection refused".to_string()));
        }
        self.successes_left.store(left - 1, Ordering::SeqCst);
        self.inner.complete(system, prompt).await
    }
}

/// Chat model that always fails, for memory-integrity tests.
pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    fn model_name(&self) -> &str {
        "failing"
    }
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Transport("connection refused".to_string()))
    }
}

pub fn chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        id: format!("{}-{}", document_id, index),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash: String::new(),
    }
}
