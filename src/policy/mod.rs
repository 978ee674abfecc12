//! Access policy tables
//!
//! Two small, auditable tables drive the non-relational parts of a
//! resolution: reserved module grants keyed by role ID, and the role-name
//! to admin-scope matrix. Both ship with built-in defaults and accept
//! deployment overrides through `Config` (see `AccessPolicyConfig`), so
//! none of the IDs below appear inline at call sites.

use crate::domain::AdminLevels;
use serde::{Deserialize, Serialize};

/// Built-in console administration role
pub const CONSOLE_ADMIN_ROLE_ID: i64 = 13;

/// Reserved module-ID range only reachable through a reserved grant
pub const RESERVED_MODULE_RANGE: (i64, i64) = (139, 143);

/// Role name granted the super-admin check
pub const SUPER_ADMIN_ROLE: &str = "SUPER_ADMIN";

/// One reserved grant: a role ID and the inclusive module-ID range it can
/// always reach, regardless of role-module rows or subscription state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedGrant {
    pub role_id: i64,
    pub module_start: i64,
    pub module_end: i64,
}

impl ReservedGrant {
    /// Default table: the console-admin role owns the reserved admin range
    pub fn builtin() -> Vec<ReservedGrant> {
        vec![ReservedGrant {
            role_id: CONSOLE_ADMIN_ROLE_ID,
            module_start: RESERVED_MODULE_RANGE.0,
            module_end: RESERVED_MODULE_RANGE.1,
        }]
    }

    pub fn covers_module(&self, module_id: i64) -> bool {
        (self.module_start..=self.module_end).contains(&module_id)
    }
}

/// Policy table answering "does any of the user's roles carry a blanket
/// grant for this module"
#[derive(Debug, Clone)]
pub struct ReservedModulePolicy {
    grants: Vec<ReservedGrant>,
}

impl Default for ReservedModulePolicy {
    fn default() -> Self {
        Self::new(ReservedGrant::builtin())
    }
}

impl ReservedModulePolicy {
    pub fn new(grants: Vec<ReservedGrant>) -> Self {
        Self { grants }
    }

    /// True if one of `role_ids` holds a reserved grant covering the module
    pub fn grants_override(&self, role_ids: &[i64], module_id: i64) -> bool {
        self.grants
            .iter()
            .any(|g| g.covers_module(module_id) && role_ids.contains(&g.role_id))
    }

    /// The table itself, for audit listings
    pub fn entries(&self) -> &[ReservedGrant] {
        &self.grants
    }
}

/// One row of the role-name to admin-scope matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRoleRule {
    pub role_name: String,
    pub is_company_admin: bool,
    pub is_branch_admin: bool,
    pub is_unit_admin: bool,
}

impl AdminRoleRule {
    /// Default matrix. Company-wide roles imply the narrower scopes.
    pub fn builtin() -> Vec<AdminRoleRule> {
        vec![
            AdminRoleRule {
                role_name: SUPER_ADMIN_ROLE.to_string(),
                is_company_admin: true,
                is_branch_admin: true,
                is_unit_admin: true,
            },
            AdminRoleRule {
                role_name: "COMPANY_ADMIN".to_string(),
                is_company_admin: true,
                is_branch_admin: true,
                is_unit_admin: true,
            },
            AdminRoleRule {
                role_name: "BRANCH_ADMIN".to_string(),
                is_company_admin: false,
                is_branch_admin: true,
                is_unit_admin: true,
            },
            AdminRoleRule {
                role_name: "UNIT_ADMIN".to_string(),
                is_company_admin: false,
                is_branch_admin: false,
                is_unit_admin: true,
            },
        ]
    }

    fn levels(&self) -> AdminLevels {
        AdminLevels {
            is_unit_admin: self.is_unit_admin,
            is_branch_admin: self.is_branch_admin,
            is_company_admin: self.is_company_admin,
        }
    }
}

/// Matrix mapping a user's role names to derived admin scope.
///
/// Matching is exact: no case-folding, no hierarchy beyond what the rows
/// themselves encode.
#[derive(Debug, Clone)]
pub struct AdminRoleMatrix {
    rules: Vec<AdminRoleRule>,
}

impl Default for AdminRoleMatrix {
    fn default() -> Self {
        Self::new(AdminRoleRule::builtin())
    }
}

impl AdminRoleMatrix {
    pub fn new(rules: Vec<AdminRoleRule>) -> Self {
        Self { rules }
    }

    /// Derive admin scope for a set of role names (OR across matches)
    pub fn levels_for<S: AsRef<str>>(&self, role_names: &[S]) -> AdminLevels {
        let mut levels = AdminLevels::default();
        for name in role_names {
            if let Some(rule) = self.rules.iter().find(|r| r.role_name == name.as_ref()) {
                levels.merge(rule.levels());
            }
        }
        levels
    }
}
