//! Document type: the unit of ingestion and ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Interrupted,
    Failed,
}

/// Summary generation lifecycle, independent of chunk indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    NotRequested,
    Pending,
    Completed,
    Failed,
}

/// Document classification gating default visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    Public,
    Restricted,
}

/// Outcome of a single pipeline step, appended to the processing log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Started,
    Done,
    Error,
    Skipped,
}

/// One entry in a document's append-only processing log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    /// Pipeline step name (e.g. `"chunk"`, `"embed"`, `"index:vector"`).
    pub step: String,

    pub state: StepState,

    /// Human-readable detail (counts, error message).
    pub detail: String,

    pub at: DateTime<Utc>,
}

impl ProcessingLogEntry {
    pub fn new(step: impl Into<String>, state: StepState, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            state,
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}

/// A document owned by a (tenant, knowledge base) pair.
///
/// Created at ingestion start and mutated through each pipeline step.
/// Deleting a document cascades to its chunks and vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub tenant_id: String,
    pub kb_id: String,

    pub title: String,

    /// Raw ingested content.
    pub content: String,

    pub status: ProcessingStatus,

    /// Append-only log of pipeline step outcomes.
    pub processing_log: Vec<ProcessingLogEntry>,

    /// LLM-generated document summary, when enrichment ran.
    pub summary: Option<String>,
    pub summary_status: SummaryStatus,

    pub sensitivity: SensitivityLevel,

    /// ACL allow-lists. A restricted document with all three empty is
    /// visible to admins only.
    pub allow_users: Vec<String>,
    pub allow_roles: Vec<String>,
    pub allow_groups: Vec<String>,

    /// Persisted cooperative-interruption flag, polled at step boundaries.
    /// Survives restarts, unlike an in-process cancellation token.
    pub interrupt_requested: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new pending document.
    pub fn new(
        tenant_id: impl Into<String>,
        kb_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            kb_id: kb_id.into(),
            title: title.into(),
            content: content.into(),
            status: ProcessingStatus::Pending,
            processing_log: Vec::new(),
            summary: None,
            summary_status: SummaryStatus::NotRequested,
            sensitivity: SensitivityLevel::Public,
            allow_users: Vec::new(),
            allow_roles: Vec::new(),
            allow_groups: Vec::new(),
            interrupt_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the sensitivity level.
    pub fn with_sensitivity(mut self, level: SensitivityLevel) -> Self {
        self.sensitivity = level;
        self
    }

    /// Set the role allow-list.
    pub fn with_allow_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_roles = roles.into_iter().map(|r| r.into()).collect();
        self
    }

    /// Set the user allow-list.
    pub fn with_allow_users(mut self, users: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_users = users.into_iter().map(|u| u.into()).collect();
        self
    }

    /// Set the group allow-list.
    pub fn with_allow_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_groups = groups.into_iter().map(|g| g.into()).collect();
        self
    }

    /// Append a processing log entry and bump `updated_at`.
    pub fn log_step(&mut self, step: &str, state: StepState, detail: impl Into<String>) {
        self.processing_log
            .push(ProcessingLogEntry::new(step, state, detail));
        self.updated_at = Utc::now();
    }

    /// Whether every allow-list is empty.
    pub fn allow_lists_empty(&self) -> bool {
        self.allow_users.is_empty() && self.allow_roles.is_empty() && self.allow_groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_pending() {
        let doc = Document::new("t1", "kb1", "Title", "Body");
        assert_eq!(doc.status, ProcessingStatus::Pending);
        assert!(doc.processing_log.is_empty());
        assert!(!doc.id.is_empty());
        assert_eq!(doc.sensitivity, SensitivityLevel::Public);
    }

    #[test]
    fn test_log_append_only() {
        let mut doc = Document::new("t1", "kb1", "Title", "Body");
        doc.log_step("chunk", StepState::Started, "");
        doc.log_step("chunk", StepState::Done, "3 chunks");
        assert_eq!(doc.processing_log.len(), 2);
        assert_eq!(doc.processing_log[1].state, StepState::Done);
    }

    #[test]
    fn test_allow_lists_empty() {
        let doc = Document::new("t1", "kb1", "Title", "Body");
        assert!(doc.allow_lists_empty());
        let doc = doc.with_allow_roles(["admin"]);
        assert!(!doc.allow_lists_empty());
    }
}
