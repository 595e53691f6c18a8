//! Conversation controller.
//!
//! Owns one session: the embedding index built at initialization, the
//! provider clients, and the bounded conversation memory. `ask` is the
//! single entry point the hosting layer calls; the controller is the only
//! writer of its memory, and a failed turn never reaches it.
//!
//! One controller per user session, constructed explicitly and handed to
//! the presentation layer — never a process-wide singleton shared across
//! unrelated users.

use anyhow::{Context, Result};

use crate::answer::{AnswerError, GroundedAnswerer};
use crate::chunk::chunk_text;
use crate::config::Config;
use crate::corpus::{scan_corpus, EmptyCorpusError};
use crate::embedding::{create_embedder, Embedder};
use crate::extract::extract_corpus;
use crate::index::EmbeddingIndex;
use crate::llm::{create_chat_model, ChatModel};
use crate::memory::ConversationMemory;
use crate::models::{Answer, Chunk, Turn};

pub struct ChatController {
    index: EmbeddingIndex,
    embedder: Box<dyn Embedder>,
    chat: Box<dyn ChatModel>,
    memory: ConversationMemory,
    top_k: usize,
    max_context_chars: usize,
    document_count: usize,
}

impl ChatController {
    /// Run the full build pipeline once (scan, extract, chunk, embed) and
    /// return a ready-to-serve controller. Any build-time provider failure
    /// aborts; the system must not answer against a partially built index.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let files = scan_corpus(&config.corpus)?;
        tracing::info!(files = files.len(), dir = %config.corpus.dir.display(), "corpus scanned");

        let (documents, skipped) = extract_corpus(&files);
        if documents.is_empty() {
            return Err(EmptyCorpusError {
                scanned: files.len(),
                skipped: skipped.len(),
            }
            .into());
        }
        if !skipped.is_empty() {
            tracing::warn!(skipped = skipped.len(), "some corpus files were skipped");
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for doc in &documents {
            chunks.extend(chunk_text(
                &doc.info.id,
                &doc.text,
                config.chunking.max_chars,
                config.chunking.overlap_chars,
            ));
        }
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "corpus chunked"
        );

        let embedder =
            create_embedder(&config.embedding).context("could not create embedding provider")?;
        let chat = create_chat_model(&config.llm).context("could not create language model")?;

        let index = EmbeddingIndex::build(chunks, embedder.as_ref(), config.embedding.batch_size)
            .await
            .context("embedding index build failed")?;

        Ok(Self::from_parts(
            index,
            embedder,
            chat,
            config.memory.window,
            config.retrieval.top_k,
            config.retrieval.max_context_chars,
            documents.len(),
        ))
    }

    /// Assemble a controller from already-built parts. This is the seam a
    /// hosting layer (or a test) uses to supply its own providers.
    pub fn from_parts(
        index: EmbeddingIndex,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
        window: usize,
        top_k: usize,
        max_context_chars: usize,
        document_count: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            memory: ConversationMemory::new(window),
            top_k,
            max_context_chars,
            document_count,
        }
    }

    /// Answer one question. The current history snapshot conditions the
    /// answer; the new turn is appended only when answering succeeds, so a
    /// failed call leaves memory exactly as it was.
    pub async fn ask(&mut self, question: &str) -> Result<Answer, AnswerError> {
        let history = self.memory.history();
        let answerer = GroundedAnswerer::new(
            &self.index,
            self.embedder.as_ref(),
            self.chat.as_ref(),
            self.top_k,
            self.max_context_chars,
        );

        let answer = answerer.answer(question, &history).await?;
        self.memory.append(Turn::new(question, answer.text.clone()));
        Ok(answer)
    }

    /// Retained turns, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.memory.history()
    }

    /// Forget the conversation so far; the index is untouched.
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}
