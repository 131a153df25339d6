//! In-memory lexical index with Okapi BM25 scoring.
//!
//! Built per (tenant, kb set) from the chunk corpus and cached by the
//! caching layer; queries score against it without touching storage.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::types::chunk::Chunk;

/// Lowercased alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

struct CorpusEntry {
    kb_id: String,
    document_id: String,
    text: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    /// Term frequencies of this chunk's text.
    terms: HashMap<String, usize>,
    len: usize,
}

/// A BM25 match, scores min-max normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct SparseHit {
    pub chunk_id: String,
    pub kb_id: String,
    pub document_id: String,
    pub text: String,
    pub score: f32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Okapi BM25 index over a chunk corpus.
///
/// Insertion order is preserved so equal scores keep a stable order
/// across runs.
pub struct Bm25Index {
    k1: f32,
    b: f32,
    entries: IndexMap<String, CorpusEntry>,
    /// Number of chunks containing each term.
    doc_freq: HashMap<String, usize>,
    total_len: usize,
}

impl Bm25Index {
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            entries: IndexMap::new(),
            doc_freq: HashMap::new(),
            total_len: 0,
        }
    }

    /// Build an index from chunks, skipping non-indexable ones.
    pub fn from_chunks<'a>(k1: f32, b: f32, chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let mut index = Self::new(k1, b);
        for chunk in chunks {
            if chunk.is_indexable() {
                index.add(chunk);
            }
        }
        index
    }

    /// Add one chunk. Re-adding an id replaces the previous entry's
    /// payload but keeps its position.
    pub fn add(&mut self, chunk: &Chunk) {
        let tokens = tokenize(&chunk.text);
        let mut terms: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *terms.entry(token.clone()).or_insert(0) += 1;
        }

        if let Some(old) = self.entries.get(&chunk.id) {
            for term in old.terms.keys() {
                if let Some(df) = self.doc_freq.get_mut(term) {
                    *df = df.saturating_sub(1);
                }
            }
            self.total_len -= old.len;
        }
        for term in terms.keys() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_len += tokens.len();

        self.entries.insert(
            chunk.id.clone(),
            CorpusEntry {
                kb_id: chunk.kb_id.clone(),
                document_id: chunk.document_id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                terms,
                len: tokens.len(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score the query against every chunk, returning the top `limit`
    /// hits with scores min-max normalized to [0, 1]. When all raw
    /// scores are equal they normalize to 1.0 if positive, else the
    /// result is empty.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SparseHit> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.entries.is_empty() {
            return Vec::new();
        }

        let n = self.entries.len() as f32;
        let avg_len = self.total_len as f32 / n;

        let mut scored: Vec<(usize, f32)> = Vec::new();
        for (pos, entry) in self.entries.values().enumerate() {
            let mut score = 0.0f32;
            for term in &query_terms {
                let Some(&tf) = entry.terms.get(term) else {
                    continue;
                };
                let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let tf = tf as f32;
                let denom = tf
                    + self.k1 * (1.0 - self.b + self.b * entry.len as f32 / avg_len.max(1e-6));
                score += idf * (tf * (self.k1 + 1.0)) / denom.max(1e-6);
            }
            if score > 0.0 {
                scored.push((pos, score));
            }
        }
        if scored.is_empty() {
            return Vec::new();
        }

        // stable sort keeps insertion order on ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        let max = scored.iter().map(|(_, s)| *s).fold(f32::MIN, f32::max);
        let min = scored.iter().map(|(_, s)| *s).fold(f32::MAX, f32::min);
        let range = max - min;

        scored
            .into_iter()
            .filter_map(|(pos, raw)| {
                let (id, entry) = self.entries.get_index(pos)?;
                let score = if range > 0.0 {
                    (raw - min) / range
                } else if max > 0.0 {
                    1.0
                } else {
                    0.0
                };
                Some(SparseHit {
                    chunk_id: id.clone(),
                    kb_id: entry.kb_id.clone(),
                    document_id: entry.document_id.clone(),
                    text: entry.text.clone(),
                    score,
                    metadata: entry.metadata.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        let mut c = Chunk::new("doc", "kb", "tenant", text, 0, 1);
        c.id = id.to_string();
        c
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Hello, World! 42"),
            vec!["hello", "world", "42"]
        );
        assert!(tokenize("...").is_empty());
    }

    #[test]
    fn test_relevant_chunk_ranks_first() {
        let chunks = vec![
            chunk("a", "rust async runtime internals"),
            chunk("b", "gardening tips for spring"),
            chunk("c", "the rust borrow checker explained with rust examples"),
        ];
        let index = Bm25Index::from_chunks(1.5, 0.75, &chunks);
        let hits = index.search("rust", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "c");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[1].score >= 0.0 && hits[1].score <= 1.0);
    }

    #[test]
    fn test_all_equal_scores_normalize_to_one() {
        let chunks = vec![chunk("a", "same words here"), chunk("b", "same words here")];
        let index = Bm25Index::from_chunks(1.5, 0.75, &chunks);
        let hits = index.search("words", 10);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| (h.score - 1.0).abs() < 1e-6));
        // insertion order on ties
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn test_no_match_is_empty() {
        let chunks = vec![chunk("a", "alpha beta")];
        let index = Bm25Index::from_chunks(1.5, 0.75, &chunks);
        assert!(index.search("gamma", 10).is_empty());
        assert!(index.search("", 10).is_empty());
    }

    #[test]
    fn test_readd_replaces_entry() {
        let mut index = Bm25Index::new(1.5, 0.75);
        index.add(&chunk("a", "old text"));
        index.add(&chunk("a", "new text"));
        assert_eq!(index.len(), 1);
        assert!(index.search("old", 10).is_empty());
        assert_eq!(index.search("new", 10).len(), 1);
    }

    #[test]
    fn test_parent_containers_excluded() {
        use crate::types::chunk::meta;
        let mut parent = chunk("p", "parent container text");
        parent
            .metadata
            .insert(meta::PARENT_ID.into(), "p".into());
        let chunks = vec![parent, chunk("c", "regular text")];
        let index = Bm25Index::from_chunks(1.5, 0.75, &chunks);
        assert_eq!(index.len(), 1);
    }
}
