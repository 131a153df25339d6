//! Retriever strategies and fusion.
//!
//! Every strategy implements the same contract: given a query, tenant,
//! KB scope, and limit, return an ordered hit list. Scores are
//! comparable within one retriever's output but not universally
//! normalized; ties keep first-seen order. Wrapper strategies (fusion,
//! ensemble, expansion) catch sub-retriever failures locally and
//! degrade to an empty contribution, propagating only when every
//! branch fails.

mod dense;
mod ensemble;
mod fusion;
mod hybrid;
mod hyde;
mod multi_query;
mod parent;
pub(crate) mod self_query;
mod sparse;

pub use dense::DenseRetriever;
pub use ensemble::EnsembleRetriever;
pub use fusion::FusionRetriever;
pub use hybrid::HybridRetriever;
pub use hyde::HydeRetriever;
pub use multi_query::MultiQueryRetriever;
pub use parent::ParentRetriever;
pub use self_query::SelfQueryRetriever;
pub use sparse::SparseRetriever;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::RetrievalCaches;
use crate::error::Result;
use crate::traits::ai::{ChatCompleter, Embedder, Reranker};
use crate::traits::store::{KbStore, VectorStore};
use crate::types::config::RetrieverConfig;
use crate::types::hit::RetrievalHit;

/// Everything a retriever may need, injected at construction.
#[derive(Clone)]
pub struct RetrieverDeps {
    pub store: Arc<dyn KbStore>,
    pub vectors: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Option<Arc<dyn ChatCompleter>>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub caches: Arc<RetrievalCaches>,
}

/// Retrieves ranked passages for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `top_k` hits across `kb_ids`, best first.
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>>;

    /// Wire name of this strategy, for logging.
    fn name(&self) -> &'static str;
}

/// Build a retriever tree from resolved configuration.
pub fn build_retriever(
    config: &RetrieverConfig,
    deps: &RetrieverDeps,
) -> Result<Arc<dyn Retriever>> {
    Ok(match config {
        RetrieverConfig::Dense => Arc::new(DenseRetriever::new(deps.clone())),
        RetrieverConfig::Sparse(params) => {
            Arc::new(SparseRetriever::new(deps.clone(), params.clone()))
        }
        RetrieverConfig::Hybrid(params) => {
            Arc::new(HybridRetriever::new(deps.clone(), params.clone()))
        }
        RetrieverConfig::Fusion(params) => {
            let first = build_retriever(&params.first, deps)?;
            let second = build_retriever(&params.second, deps)?;
            Arc::new(FusionRetriever::new(deps.clone(), params.clone(), first, second))
        }
        RetrieverConfig::Hyde(params) => {
            let inner = build_retriever(&params.inner, deps)?;
            Arc::new(HydeRetriever::new(deps.clone(), params.clone(), inner))
        }
        RetrieverConfig::MultiQuery(params) => {
            let inner = build_retriever(&params.inner, deps)?;
            Arc::new(MultiQueryRetriever::new(deps.clone(), params.clone(), inner))
        }
        RetrieverConfig::SelfQuery(params) => {
            let inner = build_retriever(&params.inner, deps)?;
            Arc::new(SelfQueryRetriever::new(deps.clone(), params.clone(), inner))
        }
        RetrieverConfig::Parent(params) => {
            let inner = build_retriever(&params.inner, deps)?;
            Arc::new(ParentRetriever::new(deps.clone(), inner))
        }
        RetrieverConfig::Ensemble(params) => {
            let mut members = Vec::with_capacity(params.members.len());
            for member in &params.members {
                members.push((build_retriever(&member.config, deps)?, member.weight));
            }
            Arc::new(EnsembleRetriever::new(params.clone(), members))
        }
    })
}

/// Reciprocal rank fusion over weighted hit lists.
///
/// Each hit contributes `weight / (k + rank + 1)` with 0-based ranks;
/// hits sharing a chunk id sum their contributions. Ties keep the
/// order ids were first seen, so fusing a list with itself preserves
/// its order.
pub fn rrf_fuse(lists: Vec<(Vec<RetrievalHit>, f32)>, k: f32) -> Vec<RetrievalHit> {
    fuse_by(lists, |hit_score, weight, rank| {
        let _ = hit_score;
        weight / (k + rank as f32 + 1.0)
    })
}

/// Weighted score fusion: each hit contributes `score * weight`, summed
/// across lists by chunk id.
pub fn weighted_fuse(lists: Vec<(Vec<RetrievalHit>, f32)>) -> Vec<RetrievalHit> {
    fuse_by(lists, |hit_score, weight, _rank| hit_score * weight)
}

fn fuse_by(
    lists: Vec<(Vec<RetrievalHit>, f32)>,
    contribution: impl Fn(f32, f32, usize) -> f32,
) -> Vec<RetrievalHit> {
    let mut first_seen: Vec<String> = Vec::new();
    let mut merged: HashMap<String, RetrievalHit> = HashMap::new();

    for (hits, weight) in lists {
        for (rank, hit) in hits.into_iter().enumerate() {
            let score = contribution(hit.score, weight, rank);
            match merged.entry(hit.chunk_id.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().score += score,
                Entry::Vacant(entry) => {
                    first_seen.push(hit.chunk_id.clone());
                    entry.insert(hit.with_score(score));
                }
            }
        }
    }

    let mut fused: Vec<RetrievalHit> = first_seen
        .iter()
        .filter_map(|id| merged.remove(id))
        .collect();
    // stable sort: equal scores keep first-seen order
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused
}
