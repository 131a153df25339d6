//! Multi-Tenant Retrieval and Indexing Core
//!
//! The retrieval engine behind a knowledge-base service: documents are
//! chunked, embedded, and indexed per (tenant, KB); queries run through
//! configurable retriever stacks with access-control trimming.
//!
//! # Design Philosophy
//!
//! **Strategies are data, not code paths**
//!
//! - Chunkers and retrievers are selected by `{name, params}` config
//! - Unknown names fail at config load, never at first use
//! - Providers (embedding, chat, rerank) sit behind traits
//! - Degraded providers degrade results, they don't fail requests
//! - Tenancy is explicit on every call, never ambient
//!
//! # Usage
//!
//! ```rust,ignore
//! use retrieval::{
//!     IngestOrchestrator, KbConfig, MemoryStore, OperatorRegistry,
//!     QueryOrchestrator, QueryRequest, RetrievalCaches,
//! };
//!
//! let registry = Arc::new(OperatorRegistry::with_builtins());
//! let caches = Arc::new(RetrievalCaches::default());
//!
//! // Ingest a document into a KB
//! let ingest = IngestOrchestrator::new(store, vectors, embedder, chat, registry, caches);
//! let outcome = ingest.ingest(doc, &config, &cancel).await?;
//!
//! // Query across KBs with access trimming
//! let request = QueryRequest::new("failover runbook", "tenant-1", ["kb-ops"])
//!     .with_user(user);
//! let hits = query.query(&request).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Provider and storage abstractions (Embedder, ChatCompleter, stores)
//! - [`types`] - Domain types (Document, Chunk, KbConfig, RetrievalHit)
//! - [`chunkers`] - Text splitting strategies
//! - [`retrievers`] - Retrieval strategies and fusion
//! - [`raptor`] - Hierarchical summary tree construction
//! - [`pipeline`] - Ingestion and query orchestration
//! - [`registry`] - Name-to-factory operator registry
//! - [`acl`] - Access-control trimming
//! - [`cache`] - TTL caches with KB-scoped invalidation
//! - [`stores`] - Storage implementations (MemoryStore)
//! - [`testing`] - Deterministic provider mocks

pub mod acl;
pub mod cache;
pub mod chunkers;
pub mod error;
pub mod pipeline;
pub mod raptor;
pub mod registry;
pub mod retrievers;
pub mod sparse;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{Result, RetrievalError};
pub use traits::{
    ai::{ChatCompleter, ChatOptions, Embedder, NoopReranker, Reranker},
    store::{
        ChunkStore, DocumentStore, KbStore, RaptorStore, VectorHit, VectorRecord, VectorStore,
    },
};
pub use types::{
    chunk::{Chunk, IndexingState, IndexingStatus},
    config::{ChunkerConfig, EmbeddingSettings, FusionMode, KbConfig, OperatorSpec, RetrieverConfig},
    document::{Document, ProcessingStatus, SensitivityLevel, StepState, SummaryStatus},
    hit::RetrievalHit,
    raptor::RaptorNode,
    user::UserContext,
};

pub use cache::{CacheSettings, CorpusKey, QueryKey, RetrievalCaches};
pub use chunkers::{build_chunker, ChunkPiece, Chunker};
pub use pipeline::{
    BackendOutcome, BatchOutcome, ConfigSource, IngestOrchestrator, IngestOutcome,
    QueryOrchestrator, QueryRequest, RetryOutcome, StaticConfigSource,
};
pub use raptor::{RaptorBuilder, RaptorConfig};
pub use registry::OperatorRegistry;
pub use retrievers::{build_retriever, Retriever, RetrieverDeps};
pub use sparse::Bm25Index;
pub use stores::memory::MemoryStore;
