//! RAPTOR hierarchical summary tree.
//!
//! Builds bottom-up: chunks become level-0 leaves; each higher level
//! clusters the working set, summarizes each cluster with the chat
//! provider, and embeds the summaries as the next working set. Summary
//! nodes are written to the vector store so retrieval can surface
//! whole-topic answers alongside raw chunks.

mod cluster;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Result, RetrievalError};
use crate::traits::ai::{ChatCompleter, ChatOptions, Embedder};
use crate::traits::store::{KbStore, VectorRecord, VectorStore};
use crate::types::chunk::{Chunk, IndexingState};
use crate::types::raptor::RaptorNode;

const SUMMARY_PROMPT: &str = "Summarize the passages below into one cohesive paragraph that \
preserves the concrete facts a search could match.\n\n{text}";

/// Tuning for the tree build.
#[derive(Debug, Clone)]
pub struct RaptorConfig {
    /// Summary levels above the leaves.
    pub max_layers: u32,
    /// Candidate GMM component counts are `1..=max_clusters`.
    pub max_clusters: usize,
    /// Membership probability needed to join a cluster.
    pub membership_threshold: f32,
    /// Character budget for concatenated cluster text fed to the
    /// summarizer.
    pub summary_char_budget: usize,
    /// Cap on the dimensionality the working set is reduced to before
    /// clustering; the target itself scales with the set size.
    pub reduced_dims: usize,
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self {
            max_layers: 3,
            max_clusters: 8,
            membership_threshold: 0.1,
            summary_char_budget: 8000,
            reduced_dims: 10,
        }
    }
}

/// Builds and persists a RAPTOR tree for one knowledge base.
pub struct RaptorBuilder {
    store: Arc<dyn KbStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatCompleter>,
    config: RaptorConfig,
}

impl RaptorBuilder {
    /// Create a builder. The chat provider is required up front so a
    /// missing provider fails before any writes, not mid-tree.
    pub fn new(
        store: Arc<dyn KbStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chat: Option<Arc<dyn ChatCompleter>>,
        config: RaptorConfig,
    ) -> Result<Self> {
        let chat = chat.ok_or_else(|| RetrievalError::unavailable("chat"))?;
        Ok(Self {
            store,
            vectors,
            embedder,
            chat,
            config,
        })
    }

    /// Build the tree over a document's indexable chunks, persist the
    /// nodes, and index the summary vectors. Returns every node created.
    ///
    /// Per-cluster summarization or embedding failures skip that
    /// cluster and continue; provider-unavailable errors abort the
    /// whole build.
    pub async fn build(
        &self,
        tenant_id: &str,
        kb_id: &str,
        chunks: &[Chunk],
    ) -> Result<Vec<RaptorNode>> {
        let leaves: Vec<RaptorNode> = chunks
            .iter()
            .filter(|c| c.is_indexable())
            .map(|c| RaptorNode::leaf(tenant_id, kb_id, &c.id, &c.text))
            .collect();
        if leaves.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = leaves.iter().map(|n| n.text.as_str()).collect();
        let embeddings = self.embed_batched(&texts).await?;

        let mut all_nodes = leaves;
        // (index into all_nodes, embedding) for the current level
        let mut working: Vec<(usize, Vec<f32>)> =
            embeddings.into_iter().enumerate().collect();

        let mut summary_vecs: Vec<(usize, Vec<f32>)> = Vec::new();
        let mut level = 1u32;
        while working.len() > 1 && level <= self.config.max_layers {
            let assignments = self.assign_clusters(&working);

            let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
            for (pos, cluster_id) in assignments.iter().enumerate() {
                clusters.entry(*cluster_id).or_default().push(pos);
            }
            let mut cluster_ids: Vec<usize> = clusters.keys().copied().collect();
            cluster_ids.sort_unstable();

            let mut next_working: Vec<(usize, Vec<f32>)> = Vec::new();
            for cluster_id in cluster_ids {
                let members = &clusters[&cluster_id];
                let member_indices: Vec<usize> =
                    members.iter().map(|pos| working[*pos].0).collect();

                match self
                    .summarize_cluster(tenant_id, kb_id, level, &member_indices, &all_nodes)
                    .await
                {
                    Ok((node, embedding)) => {
                        let node_index = all_nodes.len();
                        for idx in &member_indices {
                            all_nodes[*idx].parent_id = Some(node.id.clone());
                        }
                        all_nodes.push(node);
                        summary_vecs.push((node_index, embedding.clone()));
                        next_working.push((node_index, embedding));
                    }
                    Err(e) if e.is_unavailable() => return Err(e),
                    Err(e) => {
                        warn!(level, cluster_id, error = %e, "cluster summarization failed, skipping");
                    }
                }
            }

            if next_working.is_empty() {
                break;
            }
            working = next_working;
            level += 1;
        }

        self.persist(tenant_id, kb_id, &mut all_nodes, &summary_vecs)
            .await?;
        info!(
            kb_id,
            nodes = all_nodes.len(),
            levels = all_nodes.iter().map(|n| n.level).max().unwrap_or(0) + 1,
            "raptor tree built"
        );
        Ok(all_nodes)
    }

    fn assign_clusters(&self, working: &[(usize, Vec<f32>)]) -> Vec<usize> {
        if working.len() == 2 {
            // too few points to cluster meaningfully; merge directly
            return vec![0, 0];
        }
        let vectors: Vec<Vec<f32>> = working.iter().map(|(_, v)| v.clone()).collect();
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
        let target = self.reduction_target(vectors.len(), dim);
        let reduced = cluster::reduce_dimensions(&vectors, target);
        cluster::cluster(
            &reduced,
            self.config.max_clusters,
            self.config.membership_threshold,
        )
    }

    /// Reduction target for a working set: roughly a third of the set
    /// size, at least 2, never above the embedding dimensionality or
    /// the configured cap. Keeps the GMM's parameter count in
    /// proportion to the number of points it is fit on.
    fn reduction_target(&self, n: usize, dim: usize) -> usize {
        (n / 3).max(2).min(dim).min(self.config.reduced_dims)
    }

    async fn summarize_cluster(
        &self,
        tenant_id: &str,
        kb_id: &str,
        level: u32,
        member_indices: &[usize],
        all_nodes: &[RaptorNode],
    ) -> Result<(RaptorNode, Vec<f32>)> {
        let mut combined = String::new();
        for idx in member_indices {
            if combined.chars().count() >= self.config.summary_char_budget {
                break;
            }
            if !combined.is_empty() {
                combined.push_str("\n\n");
            }
            combined.push_str(&all_nodes[*idx].text);
        }
        if combined.chars().count() > self.config.summary_char_budget {
            combined = combined
                .chars()
                .take(self.config.summary_char_budget)
                .collect();
        }

        let prompt = SUMMARY_PROMPT.replace("{text}", &combined);
        let summary = self
            .chat
            .complete(&prompt, &ChatOptions::default().with_max_tokens(512))
            .await?;
        let embedding = self.embedder.embed(&summary).await?;

        let children_ids = member_indices
            .iter()
            .map(|idx| all_nodes[*idx].id.clone())
            .collect();
        let node = RaptorNode::summary(tenant_id, kb_id, level, summary, children_ids);
        Ok((node, embedding))
    }

    async fn embed_batched(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let limit = self.embedder.batch_limit().max(1);
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(limit) {
            out.extend(self.embedder.embed_batch(batch).await?);
        }
        Ok(out)
    }

    /// Replace the KB's previous tree, then write nodes to the record
    /// store and summary vectors to the vector store. Leaf content is
    /// already searchable through its chunk vector, so only summary
    /// nodes get vectors of their own.
    async fn persist(
        &self,
        tenant_id: &str,
        kb_id: &str,
        nodes: &mut [RaptorNode],
        summary_vecs: &[(usize, Vec<f32>)],
    ) -> Result<()> {
        let stale = self.store.get_nodes_for_kb(tenant_id, kb_id).await?;
        let stale_vector_ids: Vec<String> = stale
            .iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.vector_id.clone())
            .collect();
        if !stale_vector_ids.is_empty() {
            self.vectors.delete_ids(tenant_id, &stale_vector_ids).await?;
        }
        self.store.delete_nodes_for_kb(tenant_id, kb_id).await?;

        let mut records = Vec::new();
        for (index, vector) in summary_vecs {
            let node = &nodes[*index];
            records.push(VectorRecord {
                id: node.vector_id.clone(),
                tenant_id: tenant_id.to_string(),
                kb_id: node.kb_id.clone(),
                // summaries span documents and carry no single owner
                document_id: String::new(),
                chunk_id: None,
                text: node.text.clone(),
                vector: vector.clone(),
                metadata: serde_json::Map::new(),
            });
        }
        if !records.is_empty() {
            self.vectors.upsert(&records).await?;
        }
        for node in nodes.iter_mut() {
            node.indexing_state = IndexingState::Indexed;
        }
        self.store.put_nodes(nodes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MockChat, MockEmbedder};
    use crate::traits::store::RaptorStore;

    fn chunk(kb: &str, text: &str, index: usize, total: usize) -> Chunk {
        Chunk::new("doc", kb, "tenant", text, index, total)
    }

    fn builder(store: Arc<MemoryStore>) -> RaptorBuilder {
        RaptorBuilder::new(
            store.clone(),
            store,
            Arc::new(MockEmbedder::new(16)),
            Some(Arc::new(MockChat::echo())),
            RaptorConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_chunk_is_one_leaf() {
        let store = Arc::new(MemoryStore::new());
        let nodes = builder(store.clone())
            .build("tenant", "kb", &[chunk("kb", "only piece", 0, 1)])
            .await
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_leaf());
        assert!(nodes[0].parent_id.is_none());
    }

    #[tokio::test]
    async fn test_two_chunks_merge_directly() {
        let store = Arc::new(MemoryStore::new());
        let nodes = builder(store.clone())
            .build(
                "tenant",
                "kb",
                &[chunk("kb", "first piece", 0, 2), chunk("kb", "second piece", 1, 2)],
            )
            .await
            .unwrap();

        let summaries: Vec<&RaptorNode> = nodes.iter().filter(|n| !n.is_leaf()).collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].level, 1);
        assert_eq!(summaries[0].children_ids.len(), 2);
        for leaf in nodes.iter().filter(|n| n.is_leaf()) {
            assert_eq!(leaf.parent_id.as_deref(), Some(summaries[0].id.as_str()));
        }
    }

    #[tokio::test]
    async fn test_missing_chat_fails_before_writes() {
        let store = Arc::new(MemoryStore::new());
        let result = RaptorBuilder::new(
            store.clone(),
            store.clone(),
            Arc::new(MockEmbedder::new(16)),
            None,
            RaptorConfig::default(),
        );
        assert!(matches!(
            result.err(),
            Some(RetrievalError::ProviderUnavailable { .. })
        ));
        assert!(store.get_nodes_for_kb("tenant", "kb").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_tree() {
        let store = Arc::new(MemoryStore::new());
        let chunks = [
            chunk("kb", "first piece", 0, 2),
            chunk("kb", "second piece", 1, 2),
        ];
        let builder = builder(store.clone());
        let first = builder.build("tenant", "kb", &chunks).await.unwrap();
        let second = builder.build("tenant", "kb", &chunks).await.unwrap();
        assert_eq!(first.len(), second.len());

        // the store holds only the latest tree
        let stored = store.get_nodes_for_kb("tenant", "kb").await.unwrap();
        assert_eq!(stored.len(), second.len());
    }

    #[test]
    fn test_reduction_target_scales_with_set_size() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder(store);

        // small set in a wide space: a third of the set, floored at 2
        assert_eq!(builder.reduction_target(6, 32), 2);
        assert_eq!(builder.reduction_target(12, 32), 4);
        // large set: capped by the configured ceiling
        assert_eq!(builder.reduction_target(60, 64), 10);
        // narrow space: never above the embedding dimensionality
        assert_eq!(builder.reduction_target(30, 3), 3);
    }

    #[tokio::test]
    async fn test_levels_strictly_increase() {
        let store = Arc::new(MemoryStore::new());
        let chunks: Vec<Chunk> = (0..6)
            .map(|i| chunk("kb", &format!("piece number {}", i), i, 6))
            .collect();
        let nodes = builder(store).build("tenant", "kb", &chunks).await.unwrap();

        let by_id: HashMap<&str, &RaptorNode> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        for node in &nodes {
            if let Some(parent_id) = &node.parent_id {
                let parent = by_id[parent_id.as_str()];
                assert!(parent.level > node.level);
                assert!(parent.children_ids.contains(&node.id));
            }
        }
        assert!(nodes.iter().filter(|n| n.is_leaf()).count() == 6);
    }
}
