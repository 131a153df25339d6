//! Two-layer parent/child chunker.

use uuid::Uuid;

use crate::error::Result;
use crate::types::chunk::meta;
use crate::types::config::ParentChildParams;

use super::{cascade_split, ChunkPiece, Chunker};

/// Splits text into large parent pieces, then each parent into small
/// child pieces.
///
/// Children carry `parent_id` and `child=true` and are what gets
/// indexed; parents carry `parent_id` pointing at themselves, are
/// never indexed, and exist so the parent-document retriever can swap
/// a matched child for its surrounding context.
#[derive(Debug, Clone)]
pub struct ParentChildChunker {
    parent_max_chars: usize,
    child_max_chars: usize,
}

impl ParentChildChunker {
    pub fn new(params: ParentChildParams) -> Self {
        Self {
            parent_max_chars: params.parent_max_chars.max(1),
            child_max_chars: params.child_max_chars.max(1),
        }
    }

    fn separators() -> Vec<String> {
        ["\n\n", "\n", ". ", " "].iter().map(|s| s.to_string()).collect()
    }
}

impl Chunker for ParentChildChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        let separators = Self::separators();
        let mut pieces = Vec::new();

        for parent_text in cascade_split(text, &separators, self.parent_max_chars) {
            let parent_id = Uuid::new_v4().to_string();

            let mut parent = ChunkPiece::new(parent_text.clone());
            parent.id = Some(parent_id.clone());
            parent
                .metadata
                .insert(meta::PARENT_ID.to_string(), parent_id.clone().into());
            pieces.push(parent);

            for child_text in cascade_split(&parent_text, &separators, self.child_max_chars) {
                let mut child = ChunkPiece::new(child_text);
                child
                    .metadata
                    .insert(meta::PARENT_ID.to_string(), parent_id.clone().into());
                child.metadata.insert(meta::CHILD.to_string(), true.into());
                pieces.push(child);
            }
        }
        Ok(pieces)
    }

    fn name(&self) -> &'static str {
        "parent_child"
    }
}
