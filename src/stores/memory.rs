//! In-memory storage for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::store::{
    cosine_similarity, ChunkStore, DocumentStore, RaptorStore, VectorHit, VectorRecord,
    VectorStore,
};
use crate::types::chunk::{Chunk, IndexingState};
use crate::types::document::Document;
use crate::types::raptor::RaptorNode;

/// In-memory implementation of every storage trait.
///
/// Keys are (tenant_id, id) pairs so tenant isolation holds even if
/// ids collide across tenants. Vector search is brute-force cosine.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(String, String), Document>>,
    chunks: RwLock<HashMap<(String, String), Chunk>>,
    nodes: RwLock<HashMap<(String, String), RaptorNode>>,
    vectors: RwLock<HashMap<(String, String), VectorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(tenant_id: &str, id: &str) -> (String, String) {
        (tenant_id.to_string(), id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, tenant_id: &str, id: &str) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&Self::key(tenant_id, id)).cloned())
    }

    async fn put_document(&self, document: &Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.insert(
            Self::key(&document.tenant_id, &document.id),
            document.clone(),
        );
        Ok(())
    }

    async fn list_documents(&self, tenant_id: &str, kb_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut out: Vec<Document> = documents
            .values()
            .filter(|d| d.tenant_id == tenant_id && d.kb_id == kb_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn delete_document(&self, tenant_id: &str, id: &str) -> Result<()> {
        self.documents
            .write()
            .await
            .remove(&Self::key(tenant_id, id));
        Ok(())
    }

    async fn set_interrupt_requested(
        &self,
        tenant_id: &str,
        id: &str,
        requested: bool,
    ) -> Result<()> {
        let mut documents = self.documents.write().await;
        if let Some(doc) = documents.get_mut(&Self::key(tenant_id, id)) {
            doc.interrupt_requested = requested;
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn get_chunk(&self, tenant_id: &str, id: &str) -> Result<Option<Chunk>> {
        let chunks = self.chunks.read().await;
        Ok(chunks.get(&Self::key(tenant_id, id)).cloned())
    }

    async fn put_chunks(&self, new_chunks: &[Chunk]) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        for chunk in new_chunks {
            chunks.insert(Self::key(&chunk.tenant_id, &chunk.id), chunk.clone());
        }
        Ok(())
    }

    async fn get_chunks_for_document(
        &self,
        tenant_id: &str,
        document_id: &str,
    ) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().await;
        let mut out: Vec<Chunk> = chunks
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.document_id == document_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.chunk_index);
        Ok(out)
    }

    async fn get_chunks_for_kbs(&self, tenant_id: &str, kb_ids: &[String]) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().await;
        let mut out: Vec<Chunk> = chunks
            .values()
            .filter(|c| c.tenant_id == tenant_id && kb_ids.contains(&c.kb_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (&a.document_id, a.chunk_index).cmp(&(&b.document_id, b.chunk_index))
        });
        Ok(out)
    }

    async fn delete_chunks_for_document(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        chunks.retain(|_, c| !(c.tenant_id == tenant_id && c.document_id == document_id));
        Ok(())
    }

    async fn get_failed_chunks(
        &self,
        tenant_id: &str,
        kb_id: &str,
        store_type: &str,
        max_retries: u32,
    ) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().await;
        let mut out: Vec<Chunk> = chunks
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id
                    && c.kb_id == kb_id
                    && c.indexing.get(store_type).is_some_and(|s| {
                        s.state == IndexingState::Failed && s.retry_count < max_retries
                    })
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (&a.document_id, a.chunk_index).cmp(&(&b.document_id, b.chunk_index))
        });
        Ok(out)
    }
}

#[async_trait]
impl RaptorStore for MemoryStore {
    async fn get_node(&self, tenant_id: &str, id: &str) -> Result<Option<RaptorNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(&Self::key(tenant_id, id)).cloned())
    }

    async fn put_nodes(&self, new_nodes: &[RaptorNode]) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        for node in new_nodes {
            nodes.insert(Self::key(&node.tenant_id, &node.id), node.clone());
        }
        Ok(())
    }

    async fn get_nodes_for_kb(&self, tenant_id: &str, kb_id: &str) -> Result<Vec<RaptorNode>> {
        let nodes = self.nodes.read().await;
        let mut out: Vec<RaptorNode> = nodes
            .values()
            .filter(|n| n.tenant_id == tenant_id && n.kb_id == kb_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.level.cmp(&b.level).then(a.created_at.cmp(&b.created_at)));
        Ok(out)
    }

    async fn delete_nodes_for_kb(&self, tenant_id: &str, kb_id: &str) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        nodes.retain(|_, n| !(n.tenant_id == tenant_id && n.kb_id == kb_id));
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut vectors = self.vectors.write().await;
        for record in records {
            vectors.insert(Self::key(&record.tenant_id, &record.id), record.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        tenant_id: &str,
        kb_ids: &[String],
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let vectors = self.vectors.read().await;
        let mut hits: Vec<VectorHit> = vectors
            .values()
            .filter(|r| r.tenant_id == tenant_id && kb_ids.contains(&r.kb_id))
            .map(|r| VectorHit {
                id: r.id.clone(),
                kb_id: r.kb_id.clone(),
                document_id: r.document_id.clone(),
                chunk_id: r.chunk_id.clone(),
                text: r.text.clone(),
                score: cosine_similarity(query, &r.vector),
                metadata: r.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_for_document(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        let mut vectors = self.vectors.write().await;
        vectors.retain(|_, r| !(r.tenant_id == tenant_id && r.document_id == document_id));
        Ok(())
    }

    async fn delete_ids(&self, tenant_id: &str, ids: &[String]) -> Result<()> {
        let mut vectors = self.vectors.write().await;
        for id in ids {
            vectors.remove(&Self::key(tenant_id, id));
        }
        Ok(())
    }
}
