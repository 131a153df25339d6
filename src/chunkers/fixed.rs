//! Fixed-length and sliding-window chunkers.

use crate::error::Result;

use super::{split_chars, ChunkPiece, Chunker};

/// Splits text into consecutive fixed-length pieces.
///
/// With no overlap, concatenating the pieces reproduces the input
/// exactly.
#[derive(Debug, Clone)]
pub struct FixedChunker {
    max_chars: usize,
}

impl FixedChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }
}

impl Chunker for FixedChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        Ok(split_chars(text, self.max_chars)
            .into_iter()
            .map(ChunkPiece::new)
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Overlapping sliding-window chunker.
///
/// Windows advance by `max_chars - overlap_chars`; the overlap is
/// clamped below the window size so the stride is always positive.
#[derive(Debug, Clone)]
pub struct WindowChunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl WindowChunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self {
            max_chars,
            overlap_chars: overlap_chars.min(max_chars - 1),
        }
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Result<Vec<ChunkPiece>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let chars: Vec<char> = text.chars().collect();
        let stride = self.max_chars - self.overlap_chars;

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.max_chars).min(chars.len());
            pieces.push(ChunkPiece::new(chars[start..end].iter().collect::<String>()));
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        Ok(pieces)
    }

    fn name(&self) -> &'static str {
        "window"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_roundtrip() {
        let chunker = FixedChunker::new(4);
        let pieces = chunker.chunk("abcdefghij").unwrap();
        let joined: String = pieces.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(joined, "abcdefghij");
        assert!(pieces.iter().all(|p| p.text.chars().count() <= 4));
    }

    #[test]
    fn test_fixed_empty() {
        let chunker = FixedChunker::new(4);
        assert!(chunker.chunk("").unwrap().is_empty());
    }

    #[test]
    fn test_window_overlap() {
        let chunker = WindowChunker::new(4, 2);
        let pieces = chunker.chunk("abcdef").unwrap();
        let texts: Vec<&str> = pieces.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef"]);
    }

    #[test]
    fn test_window_overlap_clamped() {
        // overlap >= max would never advance; the constructor clamps it
        let chunker = WindowChunker::new(3, 5);
        let pieces = chunker.chunk("abcdef").unwrap();
        assert!(pieces.len() >= 2);
        assert_eq!(pieces[0].text, "abc");
    }

    proptest::proptest! {
        #[test]
        fn prop_fixed_roundtrip_and_bound(text in ".{0,200}", max in 1usize..50) {
            let pieces = FixedChunker::new(max).chunk(&text).unwrap();
            let joined: String = pieces.iter().map(|p| p.text.as_str()).collect();
            proptest::prop_assert_eq!(joined, text);
            proptest::prop_assert!(pieces.iter().all(|p| p.text.chars().count() <= max));
        }

        #[test]
        fn prop_window_covers_whole_input(text in ".{1,200}", max in 2usize..50, overlap in 0usize..50) {
            let pieces = WindowChunker::new(max, overlap).chunk(&text).unwrap();
            proptest::prop_assert!(!pieces.is_empty());
            proptest::prop_assert!(pieces.iter().all(|p| p.text.chars().count() <= max));
            // the last window always reaches the end of the input
            let tail = &pieces[pieces.len() - 1].text;
            proptest::prop_assert!(text.ends_with(tail.as_str()));
        }
    }
}
