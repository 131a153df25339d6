//! RAPTOR tree node: one level of the hierarchical summary index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::chunk::IndexingState;

/// A node in a RAPTOR summary tree.
///
/// Level 0 nodes mirror indexable chunks (weak back-reference via
/// `chunk_id`); higher levels hold LLM summaries of their children.
/// Every non-root node has exactly one parent, and level strictly
/// increases toward the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaptorNode {
    pub id: String,
    pub tenant_id: String,
    pub kb_id: String,

    /// Source chunk, present on level-0 nodes only.
    pub chunk_id: Option<String>,

    pub level: u32,

    /// Chunk text at level 0, summary text above.
    pub text: String,

    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,

    /// Id of this node's vector in the vector store.
    pub vector_id: String,

    pub indexing_state: IndexingState,

    pub created_at: DateTime<Utc>,
}

impl RaptorNode {
    /// Create a level-0 leaf node for a chunk.
    pub fn leaf(
        tenant_id: impl Into<String>,
        kb_id: impl Into<String>,
        chunk_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            vector_id: id.clone(),
            id,
            tenant_id: tenant_id.into(),
            kb_id: kb_id.into(),
            chunk_id: Some(chunk_id.into()),
            level: 0,
            text: text.into(),
            parent_id: None,
            children_ids: Vec::new(),
            indexing_state: IndexingState::Pending,
            created_at: Utc::now(),
        }
    }

    /// Create a summary node over a set of children.
    pub fn summary(
        tenant_id: impl Into<String>,
        kb_id: impl Into<String>,
        level: u32,
        text: impl Into<String>,
        children_ids: Vec<String>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            vector_id: id.clone(),
            id,
            tenant_id: tenant_id.into(),
            kb_id: kb_id.into(),
            chunk_id: None,
            level,
            text: text.into(),
            parent_id: None,
            children_ids,
            indexing_state: IndexingState::Pending,
            created_at: Utc::now(),
        }
    }

    /// Whether this node is a leaf (level 0, backed by a chunk).
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }
}
