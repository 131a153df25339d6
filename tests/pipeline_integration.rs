//! End-to-end pipeline tests: ingest documents into a MemoryStore and
//! query them back through the orchestrators.
//!
//! Most tests use the fixed chunker so a short document stays one
//! chunk, making exact-text queries rank deterministically under the
//! hash-based mock embedder.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use retrieval::testing::{MockChat, MockEmbedder};
use retrieval::traits::store::{ChunkStore, RaptorStore};
use retrieval::{
    Document, IngestOrchestrator, KbConfig, MemoryStore, OperatorRegistry, OperatorSpec,
    ProcessingStatus, QueryOrchestrator, QueryRequest, RetrievalCaches, RetrieverDeps,
    SensitivityLevel, StaticConfigSource, UserContext,
};

struct Harness {
    store: Arc<MemoryStore>,
    caches: Arc<RetrievalCaches>,
    ingest: IngestOrchestrator,
    config: KbConfig,
}

impl Harness {
    fn new(config: KbConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let caches = Arc::new(RetrievalCaches::default());
        let registry = Arc::new(OperatorRegistry::with_builtins());
        let ingest = IngestOrchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(MockEmbedder::new(16)),
            Some(Arc::new(MockChat::echo())),
            registry,
            caches.clone(),
        );
        Self {
            store,
            caches,
            ingest,
            config,
        }
    }

    /// Fixed chunker plus the given retriever.
    fn with_retriever(spec: OperatorSpec) -> Self {
        Self::new(KbConfig {
            chunker: OperatorSpec::named("fixed"),
            retriever: spec,
            ..KbConfig::default()
        })
    }

    fn query_orchestrator(&self) -> QueryOrchestrator {
        let deps = RetrieverDeps {
            store: self.store.clone(),
            vectors: self.store.clone(),
            embedder: Arc::new(MockEmbedder::new(16)),
            chat: Some(Arc::new(MockChat::echo())),
            reranker: None,
            caches: self.caches.clone(),
        };
        QueryOrchestrator::new(
            deps,
            Arc::new(OperatorRegistry::with_builtins()),
            Arc::new(StaticConfigSource::new(self.config.clone())),
        )
    }

    async fn ingest_doc(&self, doc: Document) -> String {
        let outcome = self
            .ingest
            .ingest(doc, &self.config, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, ProcessingStatus::Completed);
        outcome.document_id
    }
}

#[tokio::test]
async fn separator_chunking_survives_the_round_trip() {
    let harness = Harness::new(KbConfig::default());
    let doc_id = harness
        .ingest_doc(Document::new("t", "kb", "Doc", "A.\n\nB.\n\nC."))
        .await;

    let chunks = harness
        .store
        .get_chunks_for_document("t", &doc_id)
        .await
        .unwrap();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["A.", "B.", "C."]);
    assert!(chunks.iter().all(|c| c.total_chunks == 3));
    assert!(chunks.iter().enumerate().all(|(i, c)| c.chunk_index == i));
}

#[tokio::test]
async fn dense_query_finds_the_matching_document() {
    let harness = Harness::with_retriever(OperatorSpec::named("dense"));
    harness
        .ingest_doc(Document::new("t", "kb", "Cats", "cats chase mice"))
        .await;
    let dog_id = harness
        .ingest_doc(Document::new("t", "kb", "Dogs", "dogs chase cars"))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("dogs chase cars", "t", ["kb"]).with_top_k(2))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    // identical text embeds identically, so the dog chunk ranks first
    assert_eq!(hits[0].document_id, dog_id);
}

#[tokio::test]
async fn hybrid_query_blends_dense_and_sparse() {
    let harness = Harness::with_retriever(OperatorSpec::named("hybrid"));
    let runbook = "database failover procedure for the primary replica";
    harness
        .ingest_doc(Document::new("t", "kb", "Runbook", runbook))
        .await;
    harness
        .ingest_doc(Document::new(
            "t",
            "kb",
            "Menu",
            "the cafeteria serves soup on tuesdays",
        ))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new(runbook, "t", ["kb"]).with_top_k(2))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].text.contains("failover"));
    // exact match in both sources: 0.7 * 1.0 + 0.3 * 1.0
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn ensemble_fuses_member_rankings() {
    let spec = OperatorSpec {
        name: "ensemble".into(),
        params: json!({
            "members": [
                {"name": "dense"},
                {"name": "sparse", "weight": 2.0}
            ]
        }),
    };
    let harness = Harness::with_retriever(spec);
    harness
        .ingest_doc(Document::new("t", "kb", "Doc", "orange tabby cat"))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("orange tabby cat", "t", ["kb"]).with_top_k(3))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].text.contains("tabby"));
}

#[tokio::test]
async fn parent_retriever_returns_parent_context() {
    let config = KbConfig {
        chunker: OperatorSpec {
            name: "parent_child".into(),
            params: json!({"parent_max_chars": 200, "child_max_chars": 40}),
        },
        retriever: OperatorSpec {
            name: "parent".into(),
            params: json!({"inner": {"name": "dense"}}),
        },
        ..KbConfig::default()
    };
    let harness = Harness::new(config);
    harness
        .ingest_doc(Document::new(
            "t",
            "kb",
            "Doc",
            "The first sentence sets the scene. The second one names the culprit. \
             The third sentence wraps it up.",
        ))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("names the culprit", "t", ["kb"]).with_top_k(2))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    // every child expands to the same parent, which is wider than any child
    assert!(hits[0].text.chars().count() > 40);
}

#[tokio::test]
async fn access_trimming_hides_restricted_documents() {
    let harness = Harness::with_retriever(OperatorSpec::named("dense"));
    let public_id = harness
        .ingest_doc(Document::new("t", "kb", "Public", "quarterly report summary"))
        .await;
    let secret_id = harness
        .ingest_doc(
            Document::new("t", "kb", "Secret", "quarterly report internals")
                .with_sensitivity(SensitivityLevel::Restricted)
                .with_allow_groups(["finance"]),
        )
        .await;

    let base = QueryRequest::new("quarterly report", "t", ["kb"]).with_top_k(5);

    let plain = harness
        .query_orchestrator()
        .query(&base.clone().with_user(UserContext::new("alice")))
        .await
        .unwrap();
    assert!(!plain.is_empty());
    assert!(plain.iter().all(|h| h.document_id == public_id));

    let finance = harness
        .query_orchestrator()
        .query(&base.clone().with_user(
            UserContext::new("bob")
                .with_groups(["finance"])
                .with_clearance(SensitivityLevel::Restricted),
        ))
        .await
        .unwrap();
    assert!(finance.iter().any(|h| h.document_id == secret_id));

    let admin = harness
        .query_orchestrator()
        .query(&base.with_user(UserContext::new("root").admin()))
        .await
        .unwrap();
    let docs: HashSet<&str> = admin.iter().map(|h| h.document_id.as_str()).collect();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn batch_ingest_reports_counts_and_results_are_queryable() {
    let harness = Harness::with_retriever(OperatorSpec::named("hybrid"));
    let docs = vec![
        Document::new("t", "kb", "One", "alpha beta gamma"),
        Document::new("t", "kb", "Two", "delta epsilon zeta"),
        Document::new("t", "kb", "Three", "eta theta iota"),
    ];
    let batch = harness
        .ingest
        .ingest_batch(docs, &harness.config, &CancellationToken::new())
        .await;
    assert_eq!(batch.succeeded_count(), 3);
    assert_eq!(batch.failed_count(), 0);
    assert!(batch.succeeded.iter().all(|o| !o.document_id.is_empty()));

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("delta epsilon zeta", "t", ["kb"]).with_top_k(1))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].text.contains("delta"));
}

#[tokio::test]
async fn deleting_a_document_removes_it_from_results() {
    let harness = Harness::with_retriever(OperatorSpec::named("dense"));
    let keep_id = harness
        .ingest_doc(Document::new("t", "kb", "Keep", "shared topic keep"))
        .await;
    let drop_id = harness
        .ingest_doc(Document::new("t", "kb", "Drop", "shared topic drop"))
        .await;

    harness.ingest.delete_document("t", &drop_id).await.unwrap();

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("shared topic", "t", ["kb"]).with_top_k(5))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.document_id == keep_id));
}

#[tokio::test]
async fn raptor_tree_is_built_during_ingestion() {
    let config = KbConfig {
        raptor: true,
        ..KbConfig::default()
    };
    let harness = Harness::new(config);
    let content = "Solar panels convert sunlight.\n\nWind turbines harvest wind.\n\n\
                   Batteries store surplus power.\n\nGrids balance demand.";
    let outcome = harness
        .ingest
        .ingest(
            Document::new("t", "kb", "Energy", content),
            &harness.config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, ProcessingStatus::Completed);
    assert!(outcome.raptor_nodes > 0);

    let nodes = harness.store.get_nodes_for_kb("t", "kb").await.unwrap();
    let leaves = nodes.iter().filter(|n| n.is_leaf()).count();
    assert_eq!(leaves, outcome.chunk_count);
    assert!(nodes.len() > leaves);
}

#[tokio::test]
async fn queries_across_multiple_kbs_merge_results() {
    let harness = Harness::with_retriever(OperatorSpec::named("sparse"));
    harness
        .ingest_doc(Document::new("t", "kb-a", "A", "retrograde planets and orbits"))
        .await;
    harness
        .ingest_doc(Document::new("t", "kb-b", "B", "retrograde motion explained"))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("retrograde", "t", ["kb-a", "kb-b"]).with_top_k(5))
        .await
        .unwrap();
    let kb_ids: HashSet<&str> = hits.iter().map(|h| h.kb_id.as_str()).collect();
    assert_eq!(kb_ids.len(), 2);
}

#[tokio::test]
async fn tenants_never_see_each_other() {
    let harness = Harness::with_retriever(OperatorSpec::named("dense"));
    harness
        .ingest_doc(Document::new("tenant-a", "kb", "A", "the shared secret phrase"))
        .await;
    harness
        .ingest_doc(Document::new("tenant-b", "kb", "B", "the shared secret phrase"))
        .await;

    let hits = harness
        .query_orchestrator()
        .query(&QueryRequest::new("the shared secret phrase", "tenant-a", ["kb"]).with_top_k(10))
        .await
        .unwrap();
    assert!(!hits.is_empty());

    let chunks = harness
        .store
        .get_chunks_for_kbs("tenant-a", &["kb".to_string()])
        .await
        .unwrap();
    let tenant_a_ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert!(hits.iter().all(|h| tenant_a_ids.contains(h.chunk_id.as_str())));
}
