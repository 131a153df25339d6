//! Per-request caller identity. Never persisted.

use crate::types::document::SensitivityLevel;

/// Identity and clearance of the caller, used for access-control trimming.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,

    /// Highest sensitivity level this user may see.
    pub clearance: SensitivityLevel,

    /// Admins bypass all allow-list checks.
    pub is_admin: bool,
}

impl UserContext {
    /// A non-admin user with public clearance and no roles or groups.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            groups: Vec::new(),
            clearance: SensitivityLevel::Public,
            is_admin: false,
        }
    }

    /// Set roles.
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(|r| r.into()).collect();
        self
    }

    /// Set groups.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.groups = groups.into_iter().map(|g| g.into()).collect();
        self
    }

    /// Grant restricted clearance.
    pub fn with_clearance(mut self, clearance: SensitivityLevel) -> Self {
        self.clearance = clearance;
        self
    }

    /// Mark as admin.
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}
