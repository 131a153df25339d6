//! Heading-aware Markdown chunker.

use crate::error::Result;
use crate::types::chunk::meta;

use super::{cascade_split, ChunkPiece, Chunker};

/// Splits Markdown into sections at ATX headings.
///
/// Each piece carries a `heading_path` breadcrumb of the headings
/// enclosing it (`"Intro > Setup"`). Section bodies over the size
/// limit re-split on the default separator cascade; every resulting
/// piece keeps the section's breadcrumb.
#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    max_chars: usize,
}

impl MarkdownChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    fn heading_level(line: &str) -> Option<(usize, &str)> {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes == 0 || hashes > 6 {
            return None;
        }
        let rest = &trimmed[hashes..];
        if !rest.starts_with(' ') && !rest.is_empty() {
            return None;
        }
        Some((hashes, rest.trim()))
    }

    fn emit(&self, body: &str, path: &[String], pieces: &mut Vec<ChunkPiece>) {
        let separators: Vec<String> = ["\n\n", "\n", ". ", " "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for text in cascade_split(body, &separators, self.max_chars) {
            let mut piece = ChunkPiece::new(text);
            if !path.is_empty() {
                piece
                    .metadata
                    .insert(meta::HEADING_PATH.to_string(), path.join(" > ").into());
            }
            pieces.push(piece);
        }
    }
}

impl Chunker for MarkdownChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        let mut pieces = Vec::new();
        // heading text per level currently in scope
        let mut path: Vec<(usize, String)> = Vec::new();
        let mut body = String::new();

        let flush = |body: &mut String, path: &[(usize, String)], pieces: &mut Vec<ChunkPiece>| {
            if !body.trim().is_empty() {
                let names: Vec<String> = path.iter().map(|(_, h)| h.clone()).collect();
                self.emit(body, &names, pieces);
            }
            body.clear();
        };

        for line in text.lines() {
            match Self::heading_level(line) {
                Some((level, heading)) if !heading.is_empty() => {
                    flush(&mut body, &path, &mut pieces);
                    path.retain(|(l, _)| *l < level);
                    path.push((level, heading.to_string()));
                }
                _ => {
                    body.push_str(line);
                    body.push('\n');
                }
            }
        }
        flush(&mut body, &path, &mut pieces);

        Ok(pieces)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}
