//! Core data models used throughout corpus-chat.
//!
//! These types represent the documents, chunks, conversation turns, and
//! retrieval results that flow through the indexing and answering pipeline.

use chrono::{DateTime, Utc};

/// A PDF file discovered in the corpus folder, before extraction.
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub path: std::path::PathBuf,
    pub file_name: String,
    pub modified_at: DateTime<Utc>,
}

/// Identity of a document whose text survived extraction. The raw text
/// itself is not retained after chunking.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: String,
    pub file_name: String,
    pub modified_at: DateTime<Utc>,
}

/// A document paired with its extracted text, alive only between
/// extraction and chunking.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub info: DocumentInfo,
    pub text: String,
}

/// A corpus file that failed extraction and was skipped.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// A bounded span of extracted document text, the unit of retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A retrieved chunk with its similarity score against a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One question/answer exchange in a conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// Where an answer's supporting text came from.
#[derive(Debug, Clone)]
pub struct Citation {
    pub document_id: String,
    pub chunk_index: i64,
    pub score: f32,
}

/// A grounded answer plus the chunks it was conditioned on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}
