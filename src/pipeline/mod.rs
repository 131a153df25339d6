//! Orchestration: ingestion and query pipelines.

pub mod ingest;
pub mod query;

pub use ingest::{
    BackendOutcome, BatchOutcome, FailedIngest, IngestOrchestrator, IngestOutcome, RetryOutcome,
};
pub use query::{ConfigSource, QueryOrchestrator, QueryRequest, StaticConfigSource};
