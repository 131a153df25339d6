//! Recursive separator-cascade chunker.

use crate::error::Result;
use crate::types::config::SeparatorParams;

use super::{cascade_split, ChunkPiece, Chunker};

/// Splits on a cascade of separators, most-structural first.
///
/// The default cascade is paragraph, line, sentence, word; anything a
/// word boundary cannot bring under the limit is hard-cut.
#[derive(Debug, Clone)]
pub struct SeparatorChunker {
    max_chars: usize,
    separators: Vec<String>,
}

impl SeparatorChunker {
    pub fn new(params: SeparatorParams) -> Self {
        Self {
            max_chars: params.max_chars.max(1),
            separators: params.separators,
        }
    }
}

impl Chunker for SeparatorChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        Ok(cascade_split(text, &self.separators, self.max_chars)
            .into_iter()
            .map(ChunkPiece::new)
            .collect())
    }

    fn name(&self) -> &'static str {
        "separator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::SeparatorParams;

    fn default_chunker() -> SeparatorChunker {
        let params: SeparatorParams = serde_json::from_value(serde_json::json!({})).unwrap();
        SeparatorChunker::new(params)
    }

    #[test]
    fn test_paragraph_split() {
        let pieces = default_chunker().chunk("A.\n\nB.\n\nC.").unwrap();
        let texts: Vec<&str> = pieces.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_oversize_paragraph_falls_to_sentences() {
        let chunker = SeparatorChunker::new(SeparatorParams {
            max_chars: 12,
            separators: vec!["\n\n".into(), ". ".into()],
        });
        let pieces = chunker
            .chunk("first sentence here. second one.\n\nshort.")
            .unwrap();
        let texts: Vec<&str> = pieces.iter().map(|p| p.text.as_str()).collect();
        // the long paragraph re-splits on sentences, then hard-cuts
        assert!(texts.contains(&"short."));
        assert!(texts.iter().all(|t| t.chars().count() <= 12));
    }

    #[test]
    fn test_empty_input() {
        assert!(default_chunker().chunk("").unwrap().is_empty());
        assert!(default_chunker().chunk("  \n\n  ").unwrap().is_empty());
    }
}
