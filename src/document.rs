use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A retrieved document chunk with its source metadata and relevance score.
///
/// Chunks are produced by the vector-search collaborator, ranked best-first.
/// The engine replaces the whole `documents` field on every retrieval; chunks
/// never accumulate across passes the way messages do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The chunk text, used verbatim as generation context.
    pub content: String,
    /// Source metadata (origin URL, page, heading, ...), opaque to the engine.
    #[serde(default)]
    pub metadata: FxHashMap<String, Value>,
    /// Relevance score assigned by the search service, higher is better.
    /// Defaults to 0 so corpus files can omit it; retrievers overwrite it.
    #[serde(default)]
    pub score: f32,
}

impl DocumentChunk {
    #[must_use]
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            metadata: FxHashMap::default(),
            score,
        }
    }

    /// Attaches one metadata entry, chainable.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_round_trips() {
        let chunk = DocumentChunk::new("checkpoints are snapshots", 0.92)
            .with_metadata("source", json!("handbook.pdf"))
            .with_metadata("page", json!(12));

        let json = serde_json::to_string(&chunk).unwrap();
        let parsed: DocumentChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, chunk);
        assert_eq!(parsed.metadata.get("page"), Some(&json!(12)));
    }

    #[test]
    fn missing_metadata_defaults_to_empty() {
        let parsed: DocumentChunk =
            serde_json::from_str(r#"{"content":"x","score":0.5}"#).unwrap();
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn corpus_entries_may_omit_the_score() {
        let parsed: DocumentChunk = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(parsed.score, 0.0);
    }
}
