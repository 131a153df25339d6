//! Transient retrieval result types.

use serde::{Deserialize, Serialize};

/// A single ranked passage returned from retrieval.
///
/// Scores are comparable within one retriever's output but not
/// universally normalized across strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,

    pub kb_id: String,
    pub document_id: String,

    /// Chunk metadata, plus markers added by retrieval wrappers
    /// (see [`crate::types::chunk::meta`]).
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Queries an expansion wrapper (HyDE, multi-query) actually ran,
    /// populated for explainability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_queries: Option<Vec<String>>,
}

impl RetrievalHit {
    pub fn new(
        chunk_id: impl Into<String>,
        text: impl Into<String>,
        score: f32,
        kb_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            text: text.into(),
            score,
            kb_id: kb_id.into(),
            document_id: document_id.into(),
            metadata: serde_json::Map::new(),
            generated_queries: None,
        }
    }

    /// Replace the score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Attach chunk metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a boolean marker in the hit metadata.
    pub fn mark(&mut self, key: &str) {
        self.metadata.insert(key.to_string(), true.into());
    }
}
