//! Syntax-aware code chunker.

use regex::Regex;

use crate::error::{Result, RetrievalError};
use crate::types::chunk::meta;
use crate::types::config::CodeParams;

use super::{split_chars, ChunkPiece, Chunker};

/// Splits source code at top-level definitions.
///
/// A piece starts at each line matching a definition keyword in column
/// zero (allowing visibility/async modifiers) and runs until the next
/// one. Leading file preamble (imports, comments) forms its own piece.
/// Oversized pieces are hard-cut. The detection is a regex heuristic,
/// not a parser, and covers the common languages.
pub struct CodeChunker {
    max_chars: usize,
    language: Option<String>,
    definition: Regex,
}

const DEFINITION_PATTERN: &str = concat!(
    r"(?m)^(?:pub(?:\([a-z]+\))?\s+)?(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:unsafe\s+)?",
    r"(?:fn|struct|enum|trait|impl|mod|macro_rules|class|def|function|interface|type|const|static|var|let|func|package)\b",
);

impl CodeChunker {
    pub fn new(params: CodeParams) -> Result<Self> {
        let definition = Regex::new(DEFINITION_PATTERN)
            .map_err(|e| RetrievalError::config(format!("code chunker pattern: {}", e)))?;
        Ok(Self {
            max_chars: params.max_chars.max(1),
            language: params.language,
            definition,
        })
    }

    fn piece(&self, text: &str) -> Vec<ChunkPiece> {
        split_chars(text.trim_end(), self.max_chars)
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| {
                let mut piece = ChunkPiece::new(t);
                if let Some(lang) = &self.language {
                    piece
                        .metadata
                        .insert(meta::LANGUAGE.to_string(), lang.clone().into());
                }
                piece
            })
            .collect()
    }
}

impl Chunker for CodeChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        let starts: Vec<usize> = self.definition.find_iter(text).map(|m| m.start()).collect();
        if starts.is_empty() {
            return Ok(self.piece(text));
        }

        let mut pieces = Vec::new();
        if starts[0] > 0 {
            pieces.extend(self.piece(&text[..starts[0]]));
        }
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            pieces.extend(self.piece(&text[start..end]));
        }
        Ok(pieces)
    }

    fn name(&self) -> &'static str {
        "code"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chars: usize, language: Option<&str>) -> CodeChunker {
        CodeChunker::new(CodeParams {
            max_chars,
            language: language.map(|l| l.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_one_piece_per_definition() {
        let source = "use std::fmt;\n\nfn alpha() {\n    1\n}\n\npub struct Beta {\n    x: u32,\n}\n\nimpl Beta {\n    fn gamma(&self) {}\n}\n";
        let pieces = chunker(1600, Some("rust")).chunk(source).unwrap();
        assert_eq!(pieces.len(), 4); // preamble + fn + struct + impl
        assert!(pieces[0].text.starts_with("use std::fmt"));
        assert!(pieces[1].text.starts_with("fn alpha"));
        assert!(pieces[2].text.starts_with("pub struct Beta"));
        assert!(pieces[3].text.starts_with("impl Beta"));
        assert_eq!(
            pieces[1].metadata.get(meta::LANGUAGE).and_then(|v| v.as_str()),
            Some("rust")
        );
    }

    #[test]
    fn test_indented_definitions_ignored() {
        let source = "fn outer() {\n    fn inner() {}\n}\n";
        let pieces = chunker(1600, None).chunk(source).unwrap();
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn test_oversized_block_resplit() {
        let body = "x".repeat(100);
        let source = format!("fn big() {{\n{}\n}}\n", body);
        let pieces = chunker(40, None).chunk(&source).unwrap();
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.text.chars().count() <= 40));
    }

    #[test]
    fn test_python_definitions() {
        let source = "import os\n\ndef first():\n    pass\n\nclass Thing:\n    def method(self):\n        pass\n";
        let pieces = chunker(1600, Some("python")).chunk(source).unwrap();
        assert_eq!(pieces.len(), 3); // import + def + class
    }
}
