//! The vector-search collaborator.
//!
//! [`Retriever`] is the only interface the retrieve step depends on. Index
//! construction and document ingestion live outside this crate; the engine
//! just asks for the top-k chunks for a query. [`StaticRetriever`] is a small
//! in-memory implementation for demos and tests.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::document::DocumentChunk;

/// Errors from the vector-search collaborator.
///
/// Retrieval failures always degrade to an unaugmented answer at the node
/// boundary; they never abort a pass.
#[derive(Debug, Error, Diagnostic)]
pub enum RetrieverError {
    /// The search backend failed or was unreachable.
    #[error("search backend error: {message}")]
    #[diagnostic(code(ragloom::retriever::backend))]
    Backend { message: String },
}

/// The vector-similarity search service as consumed by the workflow.
///
/// Results are ranked best-first; implementations should return at most `k`
/// chunks.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrieverError>;
}

/// In-memory retriever scoring chunks by query-term overlap.
///
/// Scores are `matched terms / query terms` in `[0, 1]`. This is not a vector
/// index; it exists so the chat binary and tests have a working collaborator
/// without an external search service.
#[derive(Clone, Debug, Default)]
pub struct StaticRetriever {
    corpus: Vec<DocumentChunk>,
}

impl StaticRetriever {
    #[must_use]
    pub fn new(corpus: Vec<DocumentChunk>) -> Self {
        Self { corpus }
    }

    fn score(query_terms: &[String], content: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let haystack = content.to_lowercase();
        let matched = query_terms
            .iter()
            .filter(|term| haystack.contains(term.as_str()))
            .count();
        matched as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrieverError> {
        let query_terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|term| term.len() > 2)
            .map(str::to_string)
            .collect();

        let mut scored: Vec<DocumentChunk> = self
            .corpus
            .iter()
            .map(|chunk| {
                let mut chunk = chunk.clone();
                chunk.score = Self::score(&query_terms, &chunk.content);
                chunk
            })
            .filter(|chunk| chunk.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<DocumentChunk> {
        vec![
            DocumentChunk::new("Checkpoints snapshot conversation state durably.", 0.0),
            DocumentChunk::new("Threads scope independent conversations.", 0.0),
            DocumentChunk::new("Unrelated text about gardening.", 0.0),
        ]
    }

    #[tokio::test]
    async fn ranks_best_match_first_and_truncates_to_k() {
        let retriever = StaticRetriever::new(corpus());
        let results = retriever
            .search("what is a checkpoint snapshot", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Checkpoints"));
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn no_overlap_yields_empty_results() {
        let retriever = StaticRetriever::new(corpus());
        let results = retriever.search("quantum chromodynamics", 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_results() {
        let retriever = StaticRetriever::default();
        let results = retriever.search("anything", 4).await.unwrap();
        assert!(results.is_empty());
    }
}
