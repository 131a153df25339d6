//! Deterministic test doubles for the AI provider traits.
//!
//! No network, no randomness: embeddings are derived from a SHA-256 of
//! the text, so similarity is stable across runs and identical texts
//! collide on purpose.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::{Result, RetrievalError};
use crate::traits::ai::{ChatCompleter, ChatOptions, Embedder, Reranker};
use crate::types::hit::RetrievalHit;

/// Deterministic hash-based embedder.
pub struct MockEmbedder {
    dims: usize,
    fail: bool,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims, fail: false }
    }

    /// An embedder whose every call fails, for backend-failure tests.
    pub fn failing(dims: usize) -> Self {
        Self { dims, fail: true }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(RetrievalError::Embedding("mock embedder failure".into()));
        }
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        // stretch the digest across the requested dimensionality
        let mut vector = Vec::with_capacity(self.dims);
        for i in 0..self.dims {
            let byte = digest[i % digest.len()];
            let tweak = (i / digest.len()) as f32 * 0.01;
            vector.push((byte as f32 / 255.0) - 0.5 + tweak);
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

enum ChatMode {
    /// Deterministic digest of the prompt.
    Echo,
    /// Respond from canned (substring key, response) pairs.
    Canned,
    /// Every call fails with `ProviderUnavailable`.
    Unconfigured,
}

/// Scripted chat completer.
pub struct MockChat {
    mode: ChatMode,
    responses: Arc<RwLock<HashMap<String, String>>>,
}

impl MockChat {
    /// Responds with a short deterministic digest of the prompt.
    pub fn echo() -> Self {
        Self {
            mode: ChatMode::Echo,
            responses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Responds from canned pairs registered via [`respond_with`].
    /// Prompts matching no key fail with a completion error.
    ///
    /// [`respond_with`]: MockChat::respond_with
    pub fn canned() -> Self {
        Self {
            mode: ChatMode::Canned,
            responses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Every call fails with `ProviderUnavailable`.
    pub fn unconfigured() -> Self {
        Self {
            mode: ChatMode::Unconfigured,
            responses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a canned response for prompts containing `key`.
    pub async fn respond_with(&self, key: impl Into<String>, response: impl Into<String>) {
        self.responses
            .write()
            .await
            .insert(key.into(), response.into());
    }
}

#[async_trait]
impl ChatCompleter for MockChat {
    async fn complete(&self, prompt: &str, _options: &ChatOptions) -> Result<String> {
        match self.mode {
            ChatMode::Echo => {
                let mut hasher = Sha256::new();
                hasher.update(prompt.as_bytes());
                let digest = format!("{:x}", hasher.finalize());
                Ok(format!("summary {}", &digest[..12]))
            }
            ChatMode::Canned => {
                let responses = self.responses.read().await;
                for (key, response) in responses.iter() {
                    if prompt.contains(key.as_str()) {
                        return Ok(response.clone());
                    }
                }
                let preview: String = prompt.chars().take(60).collect();
                Err(RetrievalError::Completion(format!(
                    "no canned response for prompt: {}",
                    preview
                )))
            }
            ChatMode::Unconfigured => Err(RetrievalError::unavailable("chat")),
        }
    }
}

/// Reranker that reverses the candidate order, so tests can tell
/// whether reranking actually ran.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockReranker {
    fail: bool,
}

impl MockReranker {
    pub fn reversing() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Reranker for MockReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: Vec<RetrievalHit>,
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        if self.fail {
            return Err(RetrievalError::Rerank("mock reranker failure".into()));
        }
        Ok(candidates.into_iter().rev().take(top_k).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embeddings_deterministic_and_normalized() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed("same text").await.unwrap();
        let b = embedder.embed("same text").await.unwrap();
        let c = embedder.embed("other text").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_canned_chat() {
        let chat = MockChat::canned();
        chat.respond_with("weather", "sunny").await;
        let options = ChatOptions::default();
        assert_eq!(
            chat.complete("what is the weather?", &options).await.unwrap(),
            "sunny"
        );
        assert!(chat.complete("unrelated", &options).await.is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_chat_is_unavailable() {
        let chat = MockChat::unconfigured();
        let err = chat
            .complete("anything", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
