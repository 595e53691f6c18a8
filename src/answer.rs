//! Grounded answering.
//!
//! Turns a question plus conversation history into an answer constrained to
//! retrieved document content, in two stages:
//!
//! 1. *Contextualization* — with prior turns present, the raw question is
//!    rewritten into a standalone question by the chat model so follow-ups
//!    ("what about the second one?") retrieve correctly. The index is never
//!    consulted here; with no history the question passes through verbatim.
//! 2. *Retrieval-conditioned generation* — the top-k chunks for the
//!    contextualized question are packed into a context block, and the chat
//!    model is instructed to answer from that block alone. Retrieving
//!    nothing short-circuits to a fixed evidence-absent answer.
//!
//! Context never overflows silently: once `max_context_chars` is reached,
//! lowest-ranked chunks are dropped first and the drop is logged.

use crate::embedding::{Embedder, EmbeddingError};
use crate::index::EmbeddingIndex;
use crate::llm::{ChatModel, GenerationError};
use crate::models::{Answer, Citation, ScoredChunk, Turn};

/// Returned verbatim when retrieval produces no chunks to ground on.
pub const NO_EVIDENCE_ANSWER: &str =
    "The provided documents do not contain information relevant to this question.";

const ANSWER_SYSTEM: &str = "You are an assistant for staff and students of an academic \
institution. They ask questions about rules, workload, courses, course registration, and \
related programs. Respond exclusively based on the provided documents, ignoring any context \
that is not relevant to the question. If the documents do not contain the answer, say that \
the information is not present in the provided documents.";

const CONDENSE_SYSTEM: &str =
    "You rewrite follow-up questions from a conversation into standalone questions.";

/// Failure of either answering stage. The caller decides how to surface it;
/// conversation memory must be left untouched.
#[derive(Debug)]
pub enum AnswerError {
    Embedding(EmbeddingError),
    Generation(GenerationError),
}

impl std::fmt::Display for AnswerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerError::Embedding(e) => write!(f, "could not answer: {}", e),
            AnswerError::Generation(e) => write!(f, "could not answer: {}", e),
        }
    }
}

impl std::error::Error for AnswerError {}

impl From<EmbeddingError> for AnswerError {
    fn from(e: EmbeddingError) -> Self {
        AnswerError::Embedding(e)
    }
}

impl From<GenerationError> for AnswerError {
    fn from(e: GenerationError) -> Self {
        AnswerError::Generation(e)
    }
}

pub struct GroundedAnswerer<'a> {
    index: &'a EmbeddingIndex,
    embedder: &'a dyn Embedder,
    chat: &'a dyn ChatModel,
    top_k: usize,
    max_context_chars: usize,
}

impl<'a> GroundedAnswerer<'a> {
    pub fn new(
        index: &'a EmbeddingIndex,
        embedder: &'a dyn Embedder,
        chat: &'a dyn ChatModel,
        top_k: usize,
        max_context_chars: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            top_k,
            max_context_chars,
        }
    }

    /// Answer `question` against the index, resolving it first against the
    /// supplied history snapshot.
    pub async fn answer(&self, question: &str, history: &[Turn]) -> Result<Answer, AnswerError> {
        let retrieval_question = self.contextualize(question, history).await?;
        if retrieval_question != question {
            tracing::debug!(original = question, standalone = %retrieval_question, "question contextualized");
        }

        let hits = self
            .index
            .search(&retrieval_question, self.top_k, self.embedder)
            .await?;

        // Non-positive similarity is noise, not evidence; a query that
        // aligns with nothing counts as zero matches.
        let hits: Vec<ScoredChunk> = hits.into_iter().filter(|h| h.score > 0.0).collect();

        if hits.is_empty() {
            tracing::info!(question, "no chunks retrieved; returning evidence-absent answer");
            return Ok(Answer {
                text: NO_EVIDENCE_ANSWER.to_string(),
                citations: Vec::new(),
            });
        }

        let context = build_context(&hits, self.max_context_chars);

        // The grounding prompt carries the question as the user asked it;
        // the rewrite exists only to steer retrieval.
        let prompt = format!(
            "Context:\n{}\n\nQuestion: {}\nAnswer:",
            context.text, question
        );
        let text = self.chat.complete(ANSWER_SYSTEM, &prompt).await?;

        Ok(Answer {
            text,
            citations: context.citations,
        })
    }

    async fn contextualize(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = format!(
            "Given the conversation below, rewrite the follow-up question as a standalone \
             question that keeps its original meaning. Return only the rewritten question.\n\n\
             {}\n\nFollow-up question: {}\nStandalone question:",
            render_history(history),
            question
        );

        self.chat.complete(CONDENSE_SYSTEM, &prompt).await
    }
}

fn render_history(history: &[Turn]) -> String {
    let mut transcript = String::new();
    for turn in history {
        transcript.push_str("User: ");
        transcript.push_str(&turn.question);
        transcript.push_str("\nAssistant: ");
        transcript.push_str(&turn.answer);
        transcript.push('\n');
    }
    transcript.trim_end().to_string()
}

struct BuiltContext {
    text: String,
    citations: Vec<Citation>,
}

/// Pack retrieved chunks into a context block in rank order, dropping
/// lowest-ranked chunks once the budget is exceeded. The top chunk is
/// always included, truncated if it alone blows the budget.
fn build_context(hits: &[ScoredChunk], max_chars: usize) -> BuiltContext {
    let mut text = String::new();
    let mut citations = Vec::new();
    let mut used = 0usize;
    let mut dropped = 0usize;

    for (rank, hit) in hits.iter().enumerate() {
        let chunk_len = hit.chunk.text.chars().count();
        let sep_len = if text.is_empty() { 0 } else { 2 };

        if rank == 0 && chunk_len > max_chars {
            text = hit.chunk.text.chars().take(max_chars).collect();
            citations.push(citation(hit));
            tracing::warn!(
                document = %hit.chunk.document_id,
                chunk_index = hit.chunk.chunk_index,
                "top-ranked chunk exceeds the context budget; truncated"
            );
            dropped = hits.len() - 1;
            break;
        }

        if used + sep_len + chunk_len > max_chars {
            dropped = hits.len() - rank;
            break;
        }

        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&hit.chunk.text);
        used += sep_len + chunk_len;
        citations.push(citation(hit));
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = citations.len(), "context budget reached; dropped lowest-ranked chunks");
    }

    BuiltContext { text, citations }
}

fn citation(hit: &ScoredChunk) -> Citation {
    Citation {
        document_id: hit.chunk.document_id.clone(),
        chunk_index: hit.chunk.chunk_index,
        score: hit.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EmbeddingIndex;
    use crate::testutil::{chunk, ExtractiveModel, FailingEmbedder, FailingModel, HashEmbedder};

    async fn rules_index() -> EmbeddingIndex {
        let chunks = vec![
            chunk("rules.pdf", 0, "Enrollment requires 3.0 GPA."),
            chunk("rules.pdf", 1, "Course load is capped at 24 credits."),
        ];
        EmbeddingIndex::build(chunks, &HashEmbedder, 8).await.unwrap()
    }

    #[tokio::test]
    async fn answer_is_grounded_in_retrieved_text() {
        let index = rules_index().await;
        let chat = ExtractiveModel::new("unused");
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &chat, 1, 12_000);

        let answer = answerer.answer("What GPA is required?", &[]).await.unwrap();
        assert!(answer.text.contains("3.0"), "got: {}", answer.text);
        assert!(!answer.text.contains("24"), "unrelated chunk leaked: {}", answer.text);
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].document_id, "rules.pdf");
    }

    #[tokio::test]
    async fn follow_up_is_resolved_through_the_rewrite() {
        let index = rules_index().await;
        // The rewrite redirects retrieval away from the credit-cap subject.
        let chat = ExtractiveModel::new("What GPA is required for enrollment?");
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &chat, 1, 12_000);

        let history = vec![Turn::new(
            "What is the credit cap?",
            "Course load is capped at 24 credits.",
        )];
        let answer = answerer.answer("What about GPA?", &history).await.unwrap();
        assert!(answer.text.contains("3.0"), "got: {}", answer.text);
    }

    #[tokio::test]
    async fn no_history_skips_the_rewrite_stage() {
        let index = rules_index().await;
        // A rewrite pointing at the wrong subject must be ignored when
        // there is no history to resolve against.
        let chat = ExtractiveModel::new("What is the credit cap?");
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &chat, 1, 12_000);

        let answer = answerer.answer("What GPA is required?", &[]).await.unwrap();
        assert!(answer.text.contains("3.0"), "got: {}", answer.text);
    }

    #[tokio::test]
    async fn empty_index_yields_evidence_absent_answer() {
        let index = EmbeddingIndex::build(Vec::new(), &HashEmbedder, 8)
            .await
            .unwrap();
        let chat = FailingModel; // must not be reached
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &chat, 5, 12_000);

        let answer = answerer.answer("Anything?", &[]).await.unwrap();
        assert_eq!(answer.text, NO_EVIDENCE_ANSWER);
        assert!(answer.citations.is_empty());
    }

    #[tokio::test]
    async fn unrelated_question_gets_evidence_absent_answer() {
        let index = rules_index().await;
        let chat = ExtractiveModel::new("unused");
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &chat, 2, 12_000);

        // Shares no content words with the corpus: every similarity is zero.
        let answer = answerer.answer("Where does the ferry dock?", &[]).await.unwrap();
        assert_eq!(answer.text, NO_EVIDENCE_ANSWER);
    }

    #[tokio::test]
    async fn generation_failure_surfaces_as_error() {
        let index = rules_index().await;
        let answerer = GroundedAnswerer::new(&index, &HashEmbedder, &FailingModel, 2, 12_000);

        let err = answerer.answer("What GPA is required?", &[]).await.unwrap_err();
        assert!(matches!(err, AnswerError::Generation(_)));
        assert!(err.to_string().contains("could not answer"));
    }

    #[tokio::test]
    async fn query_embedding_failure_surfaces_as_embedding_error() {
        let index = rules_index().await;
        let chat = ExtractiveModel::new("unused");
        let answerer = GroundedAnswerer::new(&index, &FailingEmbedder, &chat, 2, 12_000);

        let err = answerer.answer("What GPA is required?", &[]).await.unwrap_err();
        assert!(matches!(err, AnswerError::Embedding(_)));
    }

    #[test]
    fn context_budget_drops_lowest_ranked_first() {
        let hits = vec![
            ScoredChunk { chunk: chunk("d", 0, "aaaaaaaaaa"), score: 0.9 },
            ScoredChunk { chunk: chunk("d", 1, "bbbbbbbbbb"), score: 0.5 },
            ScoredChunk { chunk: chunk("d", 2, "cccccccccc"), score: 0.1 },
        ];
        let context = build_context(&hits, 25);
        assert!(context.text.contains("aaaaaaaaaa"));
        assert!(context.text.contains("bbbbbbbbbb"));
        assert!(!context.text.contains("cccccccccc"));
        assert_eq!(context.citations.len(), 2);
    }

    #[test]
    fn oversized_top_chunk_is_truncated_not_dropped() {
        let hits = vec![
            ScoredChunk { chunk: chunk("d", 0, &"x".repeat(100)), score: 0.9 },
            ScoredChunk { chunk: chunk("d", 1, "short"), score: 0.5 },
        ];
        let context = build_context(&hits, 40);
        assert_eq!(context.text.chars().count(), 40);
        assert_eq!(context.citations.len(), 1);
    }

    #[test]
    fn history_renders_oldest_first() {
        let history = vec![Turn::new("q1", "a1"), Turn::new("q2", "a2")];
        let transcript = render_history(&history);
        assert_eq!(transcript, "User: q1\nAssistant: a1\nUser: q2\nAssistant: a2");
    }
}
