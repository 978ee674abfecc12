//! Role and company-level grant domain models

use super::permission::PermissionSet;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// Company-level grant: role -> module bits, applies company-wide for every
/// role the user holds regardless of any branch/unit on the binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoleModule {
    pub role_id: i64,
    pub module_id: i64,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_approve: bool,
}

/// A user's role assignment.
///
/// The optional `unit_id` seeds unit-hierarchy membership ONLY. It does not
/// scope which RoleModule rows apply; those apply company-wide for every
/// role the user holds. Distinct from `UnitRoleBinding`, which attaches a
/// role to a unit independent of any user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserRoleBinding {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub company_id: i64,
    pub branch_id: Option<i64>,
    pub unit_id: Option<i64>,
}

/// Query row for a company-level module grant reachable through one of the
/// user's roles. Carries the role name for provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ModuleGrant {
    pub module_id: i64,
    pub role_id: i64,
    pub role_name: String,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_approve: bool,
}

impl ModuleGrant {
    pub fn bits(&self) -> PermissionSet {
        PermissionSet::new(self.can_read, self.can_write, self.can_delete, self.can_approve)
    }
}
