//! Access-control trimming.
//!
//! The same rule is applied twice: pushed down to stores that can
//! express it (as an [`AccessFilter`]) and re-applied as a
//! deterministic post-filter over whatever the store returned, so a
//! store that ignores the filter can never leak a document.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, RetrievalError};
use crate::traits::store::DocumentStore;
use crate::types::document::{Document, SensitivityLevel};
use crate::types::hit::RetrievalHit;
use crate::types::user::UserContext;

/// Whether `user` may see `doc`.
///
/// Admins see everything. Public documents are visible to anyone. A
/// restricted document requires restricted clearance plus an allow-list
/// intersection with the user's identity; with empty allow-lists it is
/// admin-only.
pub fn can_access(user: &UserContext, doc: &Document) -> bool {
    if user.is_admin {
        return true;
    }
    if doc.sensitivity == SensitivityLevel::Public {
        return true;
    }
    if user.clearance != SensitivityLevel::Restricted {
        return false;
    }
    doc.allow_users.iter().any(|u| *u == user.user_id)
        || doc.allow_roles.iter().any(|r| user.roles.contains(r))
        || doc.allow_groups.iter().any(|g| user.groups.contains(g))
}

/// Store-level rendering of the access rule, for backends that can
/// filter before returning data.
#[derive(Debug, Clone)]
pub struct AccessFilter {
    pub user_id: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
    pub include_restricted: bool,
}

impl AccessFilter {
    /// Build the filter for a user. `None` means no filtering is
    /// needed (admin).
    pub fn from_user(user: &UserContext) -> Option<Self> {
        if user.is_admin {
            return None;
        }
        Some(Self {
            user_id: user.user_id.clone(),
            roles: user.roles.clone(),
            groups: user.groups.clone(),
            include_restricted: user.clearance == SensitivityLevel::Restricted,
        })
    }
}

/// Post-filter hits against document ACLs.
///
/// Documents are fetched once per distinct id; a hit whose document
/// record is missing is dropped. If filtering removes every hit from a
/// non-empty input, that is an [`RetrievalError::AccessDenied`] rather
/// than an ordinary empty result, so callers can distinguish "nothing
/// matched" from "everything matched was off-limits".
pub async fn trim_hits<S: DocumentStore + ?Sized>(
    store: &S,
    tenant_id: &str,
    user: &UserContext,
    hits: Vec<RetrievalHit>,
) -> Result<Vec<RetrievalHit>> {
    if hits.is_empty() || user.is_admin {
        return Ok(hits);
    }

    let doc_ids: HashSet<&str> = hits.iter().map(|h| h.document_id.as_str()).collect();
    let mut docs: HashMap<String, Document> = HashMap::with_capacity(doc_ids.len());
    for id in doc_ids {
        if let Some(doc) = store.get_document(tenant_id, id).await? {
            docs.insert(doc.id.clone(), doc);
        }
    }

    let trimmed: Vec<RetrievalHit> = hits
        .into_iter()
        .filter(|hit| {
            docs.get(&hit.document_id)
                .map(|doc| can_access(user, doc))
                .unwrap_or(false)
        })
        .collect();

    if trimmed.is_empty() {
        return Err(RetrievalError::AccessDenied);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::traits::store::DocumentStore;

    fn public_doc(id: &str) -> Document {
        let mut doc = Document::new("tenant", "kb", "title", "content");
        doc.id = id.to_string();
        doc
    }

    fn restricted_doc(id: &str, roles: &[&str]) -> Document {
        let mut doc = public_doc(id).with_sensitivity(SensitivityLevel::Restricted);
        doc.allow_roles = roles.iter().map(|r| r.to_string()).collect();
        doc.id = id.to_string();
        doc
    }

    #[test]
    fn test_public_visible_to_anyone() {
        let doc = public_doc("d1");
        assert!(can_access(&UserContext::new("u"), &doc));
    }

    #[test]
    fn test_restricted_requires_clearance_and_role() {
        let doc = restricted_doc("d1", &["admin"]);

        let plain = UserContext::new("u");
        assert!(!can_access(&plain, &doc));

        // clearance without the role is not enough
        let cleared = UserContext::new("u").with_clearance(SensitivityLevel::Restricted);
        assert!(!can_access(&cleared, &doc));

        let role_only = UserContext::new("u").with_roles(["admin"]);
        assert!(!can_access(&role_only, &doc));

        let both = UserContext::new("u")
            .with_clearance(SensitivityLevel::Restricted)
            .with_roles(["admin"]);
        assert!(can_access(&both, &doc));

        // admin flag bypasses allow-lists entirely
        assert!(can_access(&UserContext::new("u").admin(), &doc));
    }

    #[test]
    fn test_restricted_empty_allow_lists_is_admin_only() {
        let doc = restricted_doc("d1", &[]);
        let cleared = UserContext::new("u").with_clearance(SensitivityLevel::Restricted);
        assert!(!can_access(&cleared, &doc));
        assert!(can_access(&UserContext::new("u").admin(), &doc));
    }

    #[test]
    fn test_admin_needs_no_filter() {
        assert!(AccessFilter::from_user(&UserContext::new("u").admin()).is_none());
        let filter = AccessFilter::from_user(&UserContext::new("u")).unwrap();
        assert!(!filter.include_restricted);
    }

    #[tokio::test]
    async fn test_trim_all_removed_is_access_denied() {
        let store = MemoryStore::new();
        store.put_document(&restricted_doc("d1", &[])).await.unwrap();

        let hits = vec![RetrievalHit::new("c1", "text", 0.9, "kb", "d1")];
        let err = trim_hits(&store, "tenant", &UserContext::new("u"), hits)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::AccessDenied));
    }

    #[tokio::test]
    async fn test_trim_keeps_accessible_hits() {
        let store = MemoryStore::new();
        store.put_document(&public_doc("d1")).await.unwrap();
        store.put_document(&restricted_doc("d2", &[])).await.unwrap();

        let hits = vec![
            RetrievalHit::new("c1", "one", 0.9, "kb", "d1"),
            RetrievalHit::new("c2", "two", 0.8, "kb", "d2"),
        ];
        let trimmed = trim_hits(&store, "tenant", &UserContext::new("u"), hits)
            .await
            .unwrap();
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].chunk_id, "c1");
    }

    #[tokio::test]
    async fn test_trim_empty_input_is_ok() {
        let store = MemoryStore::new();
        let trimmed = trim_hits(&store, "tenant", &UserContext::new("u"), Vec::new())
            .await
            .unwrap();
        assert!(trimmed.is_empty());
    }
}
