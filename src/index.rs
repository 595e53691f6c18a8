//! In-memory embedding index.
//!
//! An append-only set of `(chunk, vector)` pairs with brute-force cosine
//! search. The index is built once per corpus snapshot at startup and is
//! read-only afterwards; a corpus change means a rebuild, not an update.

use crate::embedding::{cosine_similarity, embed_query, Embedder, EmbeddingError};
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug)]
pub struct EmbeddingIndex {
    entries: Vec<IndexEntry>,
}

impl EmbeddingIndex {
    /// Embed every chunk in batches and store the pairs. Any provider
    /// failure aborts the build; the system must not serve queries against
    /// a partially built index.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::Malformed(format!(
                    "sent {} texts, provider returned {} vectors",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    vector,
                });
            }
        }

        tracing::info!(chunks = entries.len(), "embedding index built");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed the query with the index's own provider and return the top-k
    /// chunks. An empty index returns no results, never an error.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = embed_query(embedder, query).await?;
        Ok(self.rank(&query_vec, k))
    }

    /// Score every stored vector against `query_vec` and return the
    /// `min(k, n)` best in descending order. The sort is stable, so equal
    /// scores keep insertion order.
    pub fn rank(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vec, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedder for tests: a fixed vector per known word.
    struct StubEmbedder;

    fn stub_vector(text: &str) -> Vec<f32> {
        match text {
            t if t.contains("north") => vec![1.0, 0.0, 0.0],
            t if t.contains("east") => vec![0.0, 1.0, 0.0],
            t if t.contains("up") => vec![0.0, 0.0, 1.0],
            _ => vec![0.577, 0.577, 0.577],
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| stub_vector(t)).collect())
        }
    }

    /// Embedder that always fails, for build-abort tests.
    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Transport("connection refused".to_string()))
        }
    }

    fn chunk(document_id: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: format!("{}-{}", document_id, index),
            document_id: document_id.to_string(),
            chunk_index: index,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    async fn build_index(texts: &[&str]) -> EmbeddingIndex {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| chunk("doc", i as i64, t))
            .collect();
        EmbeddingIndex::build(chunks, &StubEmbedder, 2).await.unwrap()
    }

    #[tokio::test]
    async fn search_returns_min_k_n_sorted_descending() {
        let index = build_index(&["north wall", "east wing", "up stairs"]).await;

        let results = index.search("go north", 2, &StubEmbedder).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "north wall");
        assert!(results[0].score >= results[1].score);

        // k larger than the corpus returns everything
        let all = index.search("go north", 10, &StubEmbedder).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn search_on_empty_index_returns_empty() {
        let index = EmbeddingIndex::build(Vec::new(), &StubEmbedder, 8)
            .await
            .unwrap();
        let results = index.search("anything", 5, &StubEmbedder).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        // Both "east" chunks score identically against an east query.
        let index = build_index(&["east one", "east two", "north"]).await;
        let results = index.rank(&[0.0, 1.0, 0.0], 3);
        assert_eq!(results[0].chunk.text, "east one");
        assert_eq!(results[1].chunk.text, "east two");
    }

    #[tokio::test]
    async fn build_aborts_on_provider_failure() {
        let chunks = vec![chunk("doc", 0, "text")];
        let err = EmbeddingIndex::build(chunks, &FailingEmbedder, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Transport(_)));
    }

    #[tokio::test]
    async fn build_batches_cover_all_chunks() {
        let index = build_index(&["a", "b", "c", "d", "e"]).await;
        assert_eq!(index.len(), 5);
    }
}
