//! Dense vector retriever.

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::store::VectorHit;
use crate::types::hit::RetrievalHit;

use super::{Retriever, RetrieverDeps};

/// Embeds the query and delegates to vector-store nearest-neighbor
/// search scoped to the KB set.
pub struct DenseRetriever {
    deps: RetrieverDeps,
}

impl DenseRetriever {
    pub fn new(deps: RetrieverDeps) -> Self {
        Self { deps }
    }
}

pub(crate) fn to_hit(vector_hit: VectorHit) -> RetrievalHit {
    // RAPTOR summary vectors have no backing chunk; the vector id
    // stands in so fusion still dedupes correctly
    let chunk_id = vector_hit
        .chunk_id
        .unwrap_or_else(|| vector_hit.id.clone());
    RetrievalHit::new(
        chunk_id,
        vector_hit.text,
        vector_hit.score,
        vector_hit.kb_id,
        vector_hit.document_id,
    )
    .with_metadata(vector_hit.metadata)
}

#[async_trait]
impl Retriever for DenseRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let embedding = self.deps.embedder.embed(query).await?;
        let hits = self
            .deps
            .vectors
            .search(tenant_id, kb_ids, &embedding, top_k)
            .await?;
        Ok(hits.into_iter().map(to_hit).collect())
    }

    fn name(&self) -> &'static str {
        "dense"
    }
}
