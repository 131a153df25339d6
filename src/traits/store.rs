//! Storage traits for documents, chunks, RAPTOR nodes, and vectors.
//!
//! The storage layer is split into focused traits:
//! - `DocumentStore`: document records and processing state
//! - `ChunkStore`: chunk records and indexing status
//! - `RaptorStore`: summary-tree nodes
//! - `KbStore`: composite trait combining the three
//! - `VectorStore`: embedding index, kept separate so vector backends
//!   can differ from the record store
//!
//! Every method takes an explicit `tenant_id`; implementations must
//! never return records for another tenant.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::chunk::Chunk;
use crate::types::document::Document;
use crate::types::raptor::RaptorNode;

/// Store for document records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document by id.
    async fn get_document(&self, tenant_id: &str, id: &str) -> Result<Option<Document>>;

    /// Upsert a document record.
    async fn put_document(&self, document: &Document) -> Result<()>;

    /// List documents in a knowledge base.
    async fn list_documents(&self, tenant_id: &str, kb_id: &str) -> Result<Vec<Document>>;

    /// Delete a document record.
    async fn delete_document(&self, tenant_id: &str, id: &str) -> Result<()>;

    /// Set the persisted interruption flag on a document.
    ///
    /// The ingestion pipeline polls this between steps, so a flag set
    /// from another process stops an in-flight run at the next step
    /// boundary.
    async fn set_interrupt_requested(
        &self,
        tenant_id: &str,
        id: &str,
        requested: bool,
    ) -> Result<()>;

    /// Read the persisted interruption flag.
    async fn interrupt_requested(&self, tenant_id: &str, id: &str) -> Result<bool> {
        Ok(self
            .get_document(tenant_id, id)
            .await?
            .map(|d| d.interrupt_requested)
            .unwrap_or(false))
    }
}

/// Store for chunk records.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Get a chunk by id.
    async fn get_chunk(&self, tenant_id: &str, id: &str) -> Result<Option<Chunk>>;

    /// Upsert chunk records.
    async fn put_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Get all chunks for a document, ordered by `chunk_index`.
    async fn get_chunks_for_document(
        &self,
        tenant_id: &str,
        document_id: &str,
    ) -> Result<Vec<Chunk>>;

    /// Get all chunks across a set of knowledge bases.
    async fn get_chunks_for_kbs(&self, tenant_id: &str, kb_ids: &[String]) -> Result<Vec<Chunk>>;

    /// Delete all chunks for a document.
    async fn delete_chunks_for_document(&self, tenant_id: &str, document_id: &str) -> Result<()>;

    /// Chunks whose indexing failed in `store_type` with fewer than
    /// `max_retries` attempts.
    async fn get_failed_chunks(
        &self,
        tenant_id: &str,
        kb_id: &str,
        store_type: &str,
        max_retries: u32,
    ) -> Result<Vec<Chunk>>;
}

/// Store for RAPTOR summary-tree nodes.
#[async_trait]
pub trait RaptorStore: Send + Sync {
    /// Get a node by id.
    async fn get_node(&self, tenant_id: &str, id: &str) -> Result<Option<RaptorNode>>;

    /// Upsert nodes.
    async fn put_nodes(&self, nodes: &[RaptorNode]) -> Result<()>;

    /// Get all nodes for a knowledge base.
    async fn get_nodes_for_kb(&self, tenant_id: &str, kb_id: &str) -> Result<Vec<RaptorNode>>;

    /// Delete all nodes for a knowledge base.
    async fn delete_nodes_for_kb(&self, tenant_id: &str, kb_id: &str) -> Result<()>;
}

/// Composite record store used by the pipelines.
pub trait KbStore: DocumentStore + ChunkStore + RaptorStore {}

// Blanket implementation: anything implementing all three is a KbStore
impl<T: DocumentStore + ChunkStore + RaptorStore> KbStore for T {}

/// One vector with the payload needed to build a retrieval hit.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Stable id; upserting the same id replaces the vector.
    pub id: String,
    pub tenant_id: String,
    pub kb_id: String,
    pub document_id: String,

    /// Backing chunk, absent for RAPTOR summary nodes.
    pub chunk_id: Option<String>,

    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A scored vector search result.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub kb_id: String,
    pub document_id: String,
    pub chunk_id: Option<String>,
    pub text: String,
    pub score: f32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert vectors. Writing an existing id replaces it.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Similarity search scoped to one tenant and a set of knowledge
    /// bases. Results are sorted by score, highest first.
    async fn search(
        &self,
        tenant_id: &str,
        kb_ids: &[String],
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>>;

    /// Delete all vectors for a document.
    async fn delete_for_document(&self, tenant_id: &str, document_id: &str) -> Result<()>;

    /// Delete vectors by id.
    async fn delete_ids(&self, tenant_id: &str, ids: &[String]) -> Result<()>;
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
