//! Chunk type: the retrievable unit of document text.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Metadata keys with defined meaning across the pipeline.
pub mod meta {
    /// Id of the enclosing parent chunk (parent/child chunking).
    pub const PARENT_ID: &str = "parent_id";
    /// Marks a child piece in parent/child chunking.
    pub const CHILD: &str = "child";
    /// Heading breadcrumb for markdown chunks (`"H1 > H2"`).
    pub const HEADING_PATH: &str = "heading_path";
    /// Source language for code chunks.
    pub const LANGUAGE: &str = "language";
    /// Set by retrieval wrappers when a degraded path was taken.
    pub const FALLBACK: &str = "fallback";
    /// Set by the parent-document retriever when a parent could not be
    /// resolved and the child was returned unexpanded.
    pub const PARENT_NOT_FOUND: &str = "parent_not_found";
}

/// Per-backend indexing lifecycle of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingState {
    Pending,
    Indexed,
    Failed,
}

/// Indexing status for a chunk in one backend, with retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingStatus {
    pub state: IndexingState,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl Default for IndexingStatus {
    fn default() -> Self {
        Self {
            state: IndexingState::Pending,
            retry_count: 0,
            last_error: None,
        }
    }
}

impl IndexingStatus {
    /// Mark as successfully indexed, clearing any previous error.
    pub fn mark_indexed(&mut self) {
        self.state = IndexingState::Indexed;
        self.last_error = None;
    }

    /// Mark as failed, recording the error and bumping the retry counter.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = IndexingState::Failed;
        self.retry_count += 1;
        self.last_error = Some(error.into());
    }
}

/// A retrievable unit of document text plus metadata.
///
/// `chunk_index` and `total_chunks` are stable once written. Parent
/// container chunks (a `parent_id` of their own children, not marked
/// `child=true`) are kept for context expansion only and excluded from
/// vector and lexical indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub kb_id: String,
    pub tenant_id: String,

    pub text: String,

    /// Ordinal position within the document, contiguous from 0.
    pub chunk_index: usize,
    pub total_chunks: usize,

    /// SHA-256 of the text, for staleness detection.
    pub content_hash: String,

    /// Free-form metadata; see [`meta`] for keys with defined meaning.
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Indexing status keyed by store type (e.g. `"vector"`, `"sparse"`).
    pub indexing: HashMap<String, IndexingStatus>,

    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk for a document.
    pub fn new(
        document_id: impl Into<String>,
        kb_id: impl Into<String>,
        tenant_id: impl Into<String>,
        text: impl Into<String>,
        chunk_index: usize,
        total_chunks: usize,
    ) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            kb_id: kb_id.into(),
            tenant_id: tenant_id.into(),
            content_hash: Self::hash_content(&text),
            text,
            chunk_index,
            total_chunks,
            metadata: serde_json::Map::new(),
            indexing: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Compute the content hash for chunk text.
    pub fn hash_content(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// The parent chunk id, if this chunk carries one.
    pub fn parent_id(&self) -> Option<&str> {
        self.metadata.get(meta::PARENT_ID).and_then(|v| v.as_str())
    }

    /// Whether this is a child piece from parent/child chunking.
    pub fn is_child(&self) -> bool {
        self.metadata
            .get(meta::CHILD)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Whether this chunk should be written to vector/lexical indexes.
    ///
    /// Parent container chunks exist only for context expansion.
    pub fn is_indexable(&self) -> bool {
        !(self.parent_id().is_some() && !self.is_child())
    }

    /// Indexing status for a backend, creating a pending entry if absent.
    pub fn indexing_mut(&mut self, store_type: &str) -> &mut IndexingStatus {
        self.indexing.entry(store_type.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let a = Chunk::new("d", "kb", "t", "same text", 0, 1);
        let b = Chunk::new("d", "kb", "t", "same text", 0, 1);
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_parent_container_not_indexable() {
        let mut meta_map = serde_json::Map::new();
        meta_map.insert(meta::PARENT_ID.into(), "p1".into());
        let parent = Chunk::new("d", "kb", "t", "parent text", 0, 1).with_metadata(meta_map);
        assert!(!parent.is_indexable());

        let mut child_meta = serde_json::Map::new();
        child_meta.insert(meta::PARENT_ID.into(), "p1".into());
        child_meta.insert(meta::CHILD.into(), true.into());
        let child = Chunk::new("d", "kb", "t", "child text", 0, 1).with_metadata(child_meta);
        assert!(child.is_indexable());

        let plain = Chunk::new("d", "kb", "t", "plain", 0, 1);
        assert!(plain.is_indexable());
    }

    #[test]
    fn test_retry_bookkeeping() {
        let mut chunk = Chunk::new("d", "kb", "t", "text", 0, 1);
        chunk.indexing_mut("vector").mark_failed("boom");
        chunk.indexing_mut("vector").mark_failed("boom again");
        let status = &chunk.indexing["vector"];
        assert_eq!(status.state, IndexingState::Failed);
        assert_eq!(status.retry_count, 2);

        chunk.indexing_mut("vector").mark_indexed();
        let status = &chunk.indexing["vector"];
        assert_eq!(status.state, IndexingState::Indexed);
        assert!(status.last_error.is_none());
    }
}
