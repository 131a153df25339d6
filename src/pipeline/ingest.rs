//! Ingestion pipeline - chunk, enrich, index, and summarize documents.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::RetrievalCaches;
use crate::chunkers::ChunkPiece;
use crate::error::{Result, RetrievalError};
use crate::raptor::{RaptorBuilder, RaptorConfig};
use crate::registry::OperatorRegistry;
use crate::traits::ai::{ChatCompleter, ChatOptions, Embedder};
use crate::traits::store::{KbStore, VectorRecord, VectorStore};
use crate::types::chunk::Chunk;
use crate::types::config::KbConfig;
use crate::types::document::{Document, ProcessingStatus, StepState, SummaryStatus};

const ENRICH_PROMPT: &str = "Summarize the document below in 2-3 sentences for a reader \
deciding whether it is relevant.\n\n{text}";
const ENRICH_CONTENT_BUDGET: usize = 12_000;

/// Store type labels used in chunk indexing status.
pub mod store_type {
    pub const RECORD: &str = "record";
    pub const VECTOR: &str = "vector";
}

/// Result of one backend write during ingestion.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub store_type: String,
    pub success: bool,
    /// Records written.
    pub count: usize,
    pub error: Option<String>,
}

impl BackendOutcome {
    fn ok(store_type: &str, count: usize) -> Self {
        Self {
            store_type: store_type.to_string(),
            success: true,
            count,
            error: None,
        }
    }

    fn failed(store_type: &str, error: impl std::fmt::Display) -> Self {
        Self {
            store_type: store_type.to_string(),
            success: false,
            count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Result of ingesting one document.
///
/// Backend failures do not fail ingestion; callers inspect `backends`
/// for partial failure.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: String,
    pub status: ProcessingStatus,
    pub chunk_count: usize,
    pub backends: Vec<BackendOutcome>,
    pub raptor_nodes: usize,
}

impl IngestOutcome {
    /// Whether every backend write succeeded.
    pub fn all_backends_ok(&self) -> bool {
        self.backends.iter().all(|b| b.success)
    }
}

/// One failed document in a batch.
#[derive(Debug, Clone)]
pub struct FailedIngest {
    pub title: String,
    pub error: String,
}

/// Result of a batch ingest.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<IngestOutcome>,
    pub failed: Vec<FailedIngest>,
}

impl BatchOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Result of a failed-chunk retry pass.
#[derive(Debug, Clone, Default)]
pub struct RetryOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

/// Drives a document through chunk → enrich → index → RAPTOR.
///
/// Interruption is cooperative: an in-process cancellation token and
/// the document's persisted `interrupt_requested` flag are both
/// checked between steps. An interrupted run keeps completed work (no
/// rollback) and exits with `Interrupted` status.
pub struct IngestOrchestrator {
    store: Arc<dyn KbStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chat: Option<Arc<dyn ChatCompleter>>,
    registry: Arc<OperatorRegistry>,
    caches: Arc<RetrievalCaches>,
}

impl IngestOrchestrator {
    pub fn new(
        store: Arc<dyn KbStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chat: Option<Arc<dyn ChatCompleter>>,
        registry: Arc<OperatorRegistry>,
        caches: Arc<RetrievalCaches>,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            chat,
            registry,
            caches,
        }
    }

    /// Ingest one document. The document record is created up front
    /// and mutated through each step; the returned outcome reports
    /// per-backend results.
    pub async fn ingest(
        &self,
        mut doc: Document,
        config: &KbConfig,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let chunker = self.registry.resolve_chunker(&config.chunker)?;

        doc.status = ProcessingStatus::Processing;
        self.store.put_document(&doc).await?;

        let mut outcome = IngestOutcome {
            document_id: doc.id.clone(),
            status: ProcessingStatus::Processing,
            chunk_count: 0,
            backends: Vec::new(),
            raptor_nodes: 0,
        };

        // ---- chunk ----
        if self.interrupted(&doc, cancel).await? {
            return self.finish_interrupted(doc, outcome).await;
        }
        doc.log_step("chunk", StepState::Started, "");
        let pieces = match chunker.chunk(&doc.content) {
            Ok(pieces) => pieces,
            Err(e) => {
                doc.log_step("chunk", StepState::Error, e.to_string());
                doc.status = ProcessingStatus::Failed;
                self.store.put_document(&doc).await?;
                return Err(e);
            }
        };
        let chunks = self.build_chunks(&doc, pieces);
        outcome.chunk_count = chunks.len();
        doc.log_step("chunk", StepState::Done, format!("{} chunks", chunks.len()));

        // ---- enrich ----
        if self.interrupted(&doc, cancel).await? {
            return self.finish_interrupted(doc, outcome).await;
        }
        self.enrich(&mut doc, config).await;

        if chunks.is_empty() {
            // nothing to index; still a successful ingestion
            doc.log_step("index", StepState::Skipped, "no chunks");
            doc.log_step("raptor", StepState::Skipped, "no chunks");
            return self.finish_completed(doc, outcome).await;
        }

        // ---- backend writes, each independent ----
        if self.interrupted(&doc, cancel).await? {
            return self.finish_interrupted(doc, outcome).await;
        }
        let mut chunks = chunks;
        outcome.backends = self.write_backends(&mut doc, &mut chunks).await;

        // ---- raptor ----
        if self.interrupted(&doc, cancel).await? {
            return self.finish_interrupted(doc, outcome).await;
        }
        if config.raptor {
            outcome.raptor_nodes = self.build_raptor(&mut doc, config).await;
        } else {
            doc.log_step("raptor", StepState::Skipped, "disabled");
        }

        self.finish_completed(doc, outcome).await
    }

    /// Ingest a batch of documents sequentially. One document's failure
    /// never aborts the rest.
    pub async fn ingest_batch(
        &self,
        docs: Vec<Document>,
        config: &KbConfig,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let mut batch = BatchOutcome::default();
        for doc in docs {
            let title = doc.title.clone();
            match self.ingest(doc, config, cancel).await {
                Ok(outcome) => batch.succeeded.push(outcome),
                Err(e) => {
                    warn!("ingest failed for '{}': {}", title, e);
                    batch.failed.push(FailedIngest {
                        title,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "batch ingest complete: {} succeeded, {} failed",
            batch.succeeded_count(),
            batch.failed_count()
        );
        batch
    }

    /// Re-index chunks whose vector indexing failed fewer than
    /// `max_retries` times.
    pub async fn retry_failed_chunks(
        &self,
        tenant_id: &str,
        kb_id: &str,
        max_retries: u32,
    ) -> Result<RetryOutcome> {
        let mut chunks = self
            .store
            .get_failed_chunks(tenant_id, kb_id, store_type::VECTOR, max_retries)
            .await?;
        let mut outcome = RetryOutcome {
            attempted: chunks.len(),
            succeeded: 0,
        };
        if chunks.is_empty() {
            return Ok(outcome);
        }

        for chunk in &mut chunks {
            match self.embedder.embed(&chunk.text).await {
                Ok(vector) => {
                    let record = vector_record(chunk, vector);
                    match self.vectors.upsert(&[record]).await {
                        Ok(()) => {
                            chunk.indexing_mut(store_type::VECTOR).mark_indexed();
                            outcome.succeeded += 1;
                        }
                        Err(e) => chunk.indexing_mut(store_type::VECTOR).mark_failed(e.to_string()),
                    }
                }
                Err(e) => chunk.indexing_mut(store_type::VECTOR).mark_failed(e.to_string()),
            }
        }
        self.store.put_chunks(&chunks).await?;
        self.caches.invalidate_kb(tenant_id, kb_id).await;
        info!(
            "retry pass for {}: {}/{} chunks re-indexed",
            kb_id, outcome.succeeded, outcome.attempted
        );
        Ok(outcome)
    }

    /// Delete a document and everything derived from it.
    pub async fn delete_document(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        let doc = self
            .store
            .get_document(tenant_id, document_id)
            .await?
            .ok_or_else(|| RetrievalError::DocumentNotFound {
                id: document_id.to_string(),
            })?;
        self.store
            .delete_chunks_for_document(tenant_id, document_id)
            .await?;
        self.vectors
            .delete_for_document(tenant_id, document_id)
            .await?;
        self.store.delete_document(tenant_id, document_id).await?;
        self.caches.invalidate_kb(tenant_id, &doc.kb_id).await;
        Ok(())
    }

    /// Set the persisted interruption flag; the running ingest exits at
    /// its next step boundary.
    pub async fn request_interrupt(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        self.store
            .set_interrupt_requested(tenant_id, document_id, true)
            .await
    }

    async fn interrupted(&self, doc: &Document, cancel: &CancellationToken) -> Result<bool> {
        if cancel.is_cancelled() {
            return Ok(true);
        }
        self.store
            .interrupt_requested(&doc.tenant_id, &doc.id)
            .await
    }

    async fn finish_interrupted(
        &self,
        mut doc: Document,
        mut outcome: IngestOutcome,
    ) -> Result<IngestOutcome> {
        info!("ingest interrupted for document {}", doc.id);
        doc.log_step("interrupt", StepState::Done, "stopped at step boundary");
        doc.status = ProcessingStatus::Interrupted;
        self.store.put_document(&doc).await?;
        self.caches.invalidate_kb(&doc.tenant_id, &doc.kb_id).await;
        outcome.status = ProcessingStatus::Interrupted;
        Ok(outcome)
    }

    async fn finish_completed(
        &self,
        mut doc: Document,
        mut outcome: IngestOutcome,
    ) -> Result<IngestOutcome> {
        doc.status = ProcessingStatus::Completed;
        self.store.put_document(&doc).await?;
        self.caches.invalidate_kb(&doc.tenant_id, &doc.kb_id).await;
        outcome.status = ProcessingStatus::Completed;
        Ok(outcome)
    }

    fn build_chunks(&self, doc: &Document, pieces: Vec<ChunkPiece>) -> Vec<Chunk> {
        let pieces: Vec<ChunkPiece> = pieces
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .collect();
        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| {
                let mut chunk = Chunk::new(
                    &doc.id,
                    &doc.kb_id,
                    &doc.tenant_id,
                    piece.text,
                    index,
                    total,
                )
                .with_metadata(piece.metadata);
                if let Some(id) = piece.id {
                    chunk.id = id;
                }
                chunk
            })
            .collect()
    }

    async fn enrich(&self, doc: &mut Document, config: &KbConfig) {
        if !config.enrich {
            doc.log_step("enrich", StepState::Skipped, "disabled");
            return;
        }
        let Some(chat) = &self.chat else {
            doc.log_step("enrich", StepState::Skipped, "no chat provider");
            return;
        };

        doc.log_step("enrich", StepState::Started, "");
        let content: String = doc.content.chars().take(ENRICH_CONTENT_BUDGET).collect();
        let prompt = ENRICH_PROMPT.replace("{text}", &content);
        match chat
            .complete(&prompt, &ChatOptions::default().with_max_tokens(256))
            .await
        {
            Ok(summary) => {
                doc.summary = Some(summary);
                doc.summary_status = SummaryStatus::Completed;
                doc.log_step("enrich", StepState::Done, "");
            }
            Err(e) => {
                // enrichment is best-effort; ingestion continues
                warn!("enrichment failed for document {}: {}", doc.id, e);
                doc.summary_status = SummaryStatus::Failed;
                doc.log_step("enrich", StepState::Error, e.to_string());
            }
        }
    }

    /// Write chunk records and vectors. Backends are independent: each
    /// yields its own outcome and one failure never blocks the other.
    async fn write_backends(
        &self,
        doc: &mut Document,
        chunks: &mut [Chunk],
    ) -> Vec<BackendOutcome> {
        let mut outcomes = Vec::with_capacity(2);

        // vector backend first, so its indexing status lands in the
        // records the record backend writes
        doc.log_step("index:vector", StepState::Started, "");
        let vector_outcome = self.write_vectors(chunks).await;
        match &vector_outcome {
            o if o.success => {
                doc.log_step(
                    "index:vector",
                    StepState::Done,
                    format!("{} vectors", o.count),
                )
            }
            o => {
                warn!(
                    "vector backend failed for document {}: {}",
                    doc.id,
                    o.error.as_deref().unwrap_or("unknown")
                );
                doc.log_step(
                    "index:vector",
                    StepState::Error,
                    o.error.clone().unwrap_or_default(),
                )
            }
        }
        outcomes.push(vector_outcome);

        doc.log_step("index:record", StepState::Started, "");
        for chunk in chunks.iter_mut() {
            chunk.indexing_mut(store_type::RECORD).mark_indexed();
        }
        let record_outcome = match self.store.put_chunks(chunks).await {
            Ok(()) => BackendOutcome::ok(store_type::RECORD, chunks.len()),
            Err(e) => BackendOutcome::failed(store_type::RECORD, e),
        };
        match &record_outcome {
            o if o.success => doc.log_step(
                "index:record",
                StepState::Done,
                format!("{} chunks", o.count),
            ),
            o => {
                warn!(
                    "record backend failed for document {}: {}",
                    doc.id,
                    o.error.as_deref().unwrap_or("unknown")
                );
                doc.log_step(
                    "index:record",
                    StepState::Error,
                    o.error.clone().unwrap_or_default(),
                )
            }
        }
        outcomes.push(record_outcome);

        outcomes
    }

    async fn write_vectors(&self, chunks: &mut [Chunk]) -> BackendOutcome {
        let indexable: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_indexable())
            .map(|(i, _)| i)
            .collect();
        if indexable.is_empty() {
            return BackendOutcome::ok(store_type::VECTOR, 0);
        }

        let texts: Vec<&str> = indexable.iter().map(|i| chunks[*i].text.as_str()).collect();
        let limit = self.embedder.batch_limit().max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(limit) {
            match self.embedder.embed_batch(batch).await {
                Ok(mut batch_vectors) => vectors.append(&mut batch_vectors),
                Err(e) => {
                    for i in &indexable {
                        chunks[*i]
                            .indexing_mut(store_type::VECTOR)
                            .mark_failed(e.to_string());
                    }
                    return BackendOutcome::failed(store_type::VECTOR, e);
                }
            }
        }

        let records: Vec<VectorRecord> = indexable
            .iter()
            .zip(vectors)
            .map(|(i, vector)| vector_record(&chunks[*i], vector))
            .collect();
        match self.vectors.upsert(&records).await {
            Ok(()) => {
                for i in &indexable {
                    chunks[*i].indexing_mut(store_type::VECTOR).mark_indexed();
                }
                BackendOutcome::ok(store_type::VECTOR, records.len())
            }
            Err(e) => {
                for i in &indexable {
                    chunks[*i]
                        .indexing_mut(store_type::VECTOR)
                        .mark_failed(e.to_string());
                }
                BackendOutcome::failed(store_type::VECTOR, e)
            }
        }
    }

    /// Rebuild the KB's summary tree over its whole chunk corpus; the
    /// previous tree is replaced.
    async fn build_raptor(&self, doc: &mut Document, config: &KbConfig) -> usize {
        doc.log_step("raptor", StepState::Started, "");
        let kb_ids = [doc.kb_id.clone()];
        let chunks = match self.store.get_chunks_for_kbs(&doc.tenant_id, &kb_ids).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("raptor corpus load failed for kb {}: {}", doc.kb_id, e);
                doc.log_step("raptor", StepState::Error, e.to_string());
                return 0;
            }
        };
        let raptor_config = RaptorConfig {
            max_layers: config.raptor_max_layers,
            ..RaptorConfig::default()
        };
        let builder = match RaptorBuilder::new(
            self.store.clone(),
            self.vectors.clone(),
            self.embedder.clone(),
            self.chat.clone(),
            raptor_config,
        ) {
            Ok(builder) => builder,
            Err(e) => {
                warn!("raptor unavailable for document {}: {}", doc.id, e);
                doc.log_step("raptor", StepState::Error, e.to_string());
                return 0;
            }
        };
        match builder.build(&doc.tenant_id, &doc.kb_id, &chunks).await {
            Ok(nodes) => {
                doc.log_step("raptor", StepState::Done, format!("{} nodes", nodes.len()));
                nodes.len()
            }
            Err(e) => {
                warn!("raptor build failed for document {}: {}", doc.id, e);
                doc.log_step("raptor", StepState::Error, e.to_string());
                0
            }
        }
    }
}

fn vector_record(chunk: &Chunk, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: chunk.id.clone(),
        tenant_id: chunk.tenant_id.clone(),
        kb_id: chunk.kb_id.clone(),
        document_id: chunk.document_id.clone(),
        chunk_id: Some(chunk.id.clone()),
        text: chunk.text.clone(),
        vector,
        metadata: chunk.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MockChat, MockEmbedder};
    use crate::traits::store::{ChunkStore, DocumentStore};

    fn orchestrator(store: Arc<MemoryStore>, embedder: MockEmbedder) -> IngestOrchestrator {
        IngestOrchestrator::new(
            store.clone(),
            store,
            Arc::new(embedder),
            Some(Arc::new(MockChat::echo())),
            Arc::new(OperatorRegistry::with_builtins()),
            Arc::new(RetrievalCaches::default()),
        )
    }

    #[tokio::test]
    async fn test_ingest_happy_path() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::new(16));
        let doc = Document::new("t", "kb", "Doc", "A.\n\nB.\n\nC.");
        let outcome = orch
            .ingest(doc, &KbConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, ProcessingStatus::Completed);
        assert_eq!(outcome.chunk_count, 3);
        assert!(outcome.all_backends_ok());

        let chunks = store
            .get_chunks_for_document("t", &outcome.document_id)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "A.");
        assert_eq!(chunks[0].total_chunks, 3);

        let stored = store
            .get_document("t", &outcome.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ProcessingStatus::Completed);
        assert!(stored
            .processing_log
            .iter()
            .any(|e| e.step == "chunk" && e.state == StepState::Done));
    }

    #[tokio::test]
    async fn test_empty_content_completes_with_zero_chunks() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::new(16));
        let doc = Document::new("t", "kb", "Empty", "");
        let outcome = orch
            .ingest(doc, &KbConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, ProcessingStatus::Completed);
        assert_eq!(outcome.chunk_count, 0);
        assert!(outcome.backends.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_partial_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::failing(16));
        let doc = Document::new("t", "kb", "Doc", "some content here");
        let outcome = orch
            .ingest(doc, &KbConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, ProcessingStatus::Completed);
        assert!(!outcome.all_backends_ok());
        let vector = outcome
            .backends
            .iter()
            .find(|b| b.store_type == store_type::VECTOR)
            .unwrap();
        assert!(!vector.success);
        let record = outcome
            .backends
            .iter()
            .find(|b| b.store_type == store_type::RECORD)
            .unwrap();
        assert!(record.success);

        // failure recorded on the chunk for the retry pass
        let chunks = store
            .get_failed_chunks("t", "kb", store_type::VECTOR, 3)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_interrupts_before_work() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::new(16));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let doc = Document::new("t", "kb", "Doc", "content");
        let outcome = orch
            .ingest(doc, &KbConfig::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.status, ProcessingStatus::Interrupted);
        assert_eq!(outcome.chunk_count, 0);

        let stored = store
            .get_document("t", &outcome.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ProcessingStatus::Interrupted);
    }

    #[tokio::test]
    async fn test_batch_reports_partial_failure() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::new(16));

        let mut bad_config = KbConfig::default();
        bad_config.chunker.name = "nope".to_string();
        let docs = vec![Document::new("t", "kb", "One", "alpha")];
        let bad = orch
            .ingest_batch(docs, &bad_config, &CancellationToken::new())
            .await;
        assert_eq!(bad.succeeded_count(), 0);
        assert_eq!(bad.failed_count(), 1);

        let docs = vec![
            Document::new("t", "kb", "One", "alpha"),
            Document::new("t", "kb", "Two", "beta"),
        ];
        let batch = orch
            .ingest_batch(docs, &KbConfig::default(), &CancellationToken::new())
            .await;
        assert_eq!(batch.succeeded_count(), 2);
        assert_eq!(batch.failed_count(), 0);
        assert!(batch.succeeded.iter().all(|o| !o.document_id.is_empty()));
    }

    #[tokio::test]
    async fn test_retry_failed_chunks() {
        let store = Arc::new(MemoryStore::new());
        let failing = orchestrator(store.clone(), MockEmbedder::failing(16));
        let doc = Document::new("t", "kb", "Doc", "retry me");
        failing
            .ingest(doc, &KbConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        let working = orchestrator(store.clone(), MockEmbedder::new(16));
        let retry = working.retry_failed_chunks("t", "kb", 3).await.unwrap();
        assert_eq!(retry.attempted, 1);
        assert_eq!(retry.succeeded, 1);

        // nothing left below the retry cap
        let retry2 = working.retry_failed_chunks("t", "kb", 3).await.unwrap();
        assert_eq!(retry2.attempted, 0);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), MockEmbedder::new(16));
        let doc = Document::new("t", "kb", "Doc", "to be deleted");
        let outcome = orch
            .ingest(doc, &KbConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        orch.delete_document("t", &outcome.document_id).await.unwrap();
        assert!(matches!(
            orch.delete_document("t", "no-such-doc").await,
            Err(RetrievalError::DocumentNotFound { .. })
        ));
        assert!(store
            .get_document("t", &outcome.document_id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_chunks_for_document("t", &outcome.document_id)
            .await
            .unwrap()
            .is_empty());
    }
}
