//! Trait seams: AI providers and storage backends.

pub mod ai;
pub mod store;

pub use ai::{ChatCompleter, ChatOptions, Embedder, NoopReranker, Reranker};
pub use store::{
    cosine_similarity, ChunkStore, DocumentStore, KbStore, RaptorStore, VectorHit, VectorRecord,
    VectorStore,
};
