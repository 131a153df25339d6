//! Chunking strategies.
//!
//! A chunker splits document text into pieces; the ingestion pipeline
//! turns pieces into persisted [`crate::types::chunk::Chunk`]s. All
//! size limits are in characters, and splitting always respects UTF-8
//! char boundaries.

mod code;
mod fixed;
mod markdown;
mod parent_child;
mod separator;

pub use code::CodeChunker;
pub use fixed::{FixedChunker, WindowChunker};
pub use markdown::MarkdownChunker;
pub use parent_child::ParentChildChunker;
pub use separator::SeparatorChunker;

use std::sync::Arc;

use crate::error::Result;
use crate::types::config::ChunkerConfig;

/// Construct a chunker from resolved configuration.
pub fn build_chunker(config: &ChunkerConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config {
        ChunkerConfig::Fixed(p) => Arc::new(FixedChunker::new(p.max_chars)),
        ChunkerConfig::Window(p) => Arc::new(WindowChunker::new(p.max_chars, p.overlap_chars)),
        ChunkerConfig::Separator(p) => Arc::new(SeparatorChunker::new(p.clone())),
        ChunkerConfig::Markdown(p) => Arc::new(MarkdownChunker::new(p.max_chars)),
        ChunkerConfig::Code(p) => Arc::new(CodeChunker::new(p.clone())?),
        ChunkerConfig::ParentChild(p) => Arc::new(ParentChildChunker::new(p.clone())),
    })
}

/// One piece of split text, before it becomes a persisted chunk.
#[derive(Debug, Clone)]
pub struct ChunkPiece {
    /// Preassigned chunk id. Set only by strategies that need to link
    /// pieces to each other (parent/child); otherwise ingestion assigns
    /// a fresh id.
    pub id: Option<String>,

    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ChunkPiece {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Splits document text into pieces.
///
/// Implementations must be deterministic: the same text and parameters
/// always produce the same pieces.
pub trait Chunker: Send + Sync {
    /// Split `text` into pieces. Empty or whitespace-only text yields
    /// an empty vec, not an error.
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>>;

    /// Wire name of this strategy, for logging.
    fn name(&self) -> &'static str;
}

/// Split text into consecutive runs of at most `max_chars` characters.
pub(crate) fn split_chars(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

/// Recursively split on a separator cascade.
///
/// Splits unconditionally on the first separator present in the text,
/// keeping the separator attached to the preceding segment. Segments
/// still over `max_chars` are re-split with the remaining separators;
/// when the cascade is exhausted an oversize segment is hard-cut at
/// `max_chars`. Segments that trim to empty are dropped.
pub(crate) fn cascade_split(text: &str, separators: &[String], max_chars: usize) -> Vec<String> {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || !text.contains(sep.as_str()) {
            continue;
        }
        let rest = &separators[i + 1..];
        let mut pieces = Vec::new();
        for segment in text.split_inclusive(sep.as_str()) {
            let trimmed = segment.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.chars().count() <= max_chars {
                pieces.push(trimmed.to_string());
            } else {
                pieces.extend(cascade_split(segment, rest, max_chars));
            }
        }
        return pieces;
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        split_chars(trimmed, max_chars)
    }
}
