//! Permission kinds, bit-sets and resolved permission snapshots

use super::role::ModuleGrant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One of the four permission bits a module grant can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Read,
    Write,
    Delete,
    Approve,
}

/// Error for an unrecognized permission kind string.
///
/// Kept distinct from a denial: callers map this to an invalid-argument
/// failure, never to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPermissionKind(pub String);

impl fmt::Display for InvalidPermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission kind: {}", self.0)
    }
}

impl std::error::Error for InvalidPermissionKind {}

impl FromStr for PermissionKind {
    type Err = InvalidPermissionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(PermissionKind::Read),
            "write" => Ok(PermissionKind::Write),
            "delete" => Ok(PermissionKind::Delete),
            "approve" => Ok(PermissionKind::Approve),
            other => Err(InvalidPermissionKind(other.to_string())),
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionKind::Read => "read",
            PermissionKind::Write => "write",
            PermissionKind::Delete => "delete",
            PermissionKind::Approve => "approve",
        };
        f.write_str(s)
    }
}

/// The four permission bits for one module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_approve: bool,
}

impl PermissionSet {
    pub fn new(can_read: bool, can_write: bool, can_delete: bool, can_approve: bool) -> Self {
        Self {
            can_read,
            can_write,
            can_delete,
            can_approve,
        }
    }

    /// All four bits granted
    pub fn full() -> Self {
        Self::new(true, true, true, true)
    }

    /// OR-merge another set into this one. Monotonic: a bit granted by any
    /// source stays granted.
    pub fn merge(&mut self, other: PermissionSet) {
        self.can_read |= other.can_read;
        self.can_write |= other.can_write;
        self.can_delete |= other.can_delete;
        self.can_approve |= other.can_approve;
    }

    pub fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Read => self.can_read,
            PermissionKind::Write => self.can_write,
            PermissionKind::Delete => self.can_delete,
            PermissionKind::Approve => self.can_approve,
        }
    }

    pub fn grants_any(&self) -> bool {
        self.can_read || self.can_write || self.can_delete || self.can_approve
    }
}

/// Scope level a grant was contributed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
    Company,
    Unit,
}

/// Kind of relation a grant came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSourceType {
    /// Company-level role grant (role_modules row)
    Role,
    /// Unit-scoped grant (unit_role_modules row)
    UnitRole,
}

/// One provenance entry behind a resolved permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSource {
    pub source_type: GrantSourceType,
    pub role_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    pub level: GrantLevel,
}

/// Resolved permission for one module, with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModulePermission {
    #[serde(flatten)]
    pub permissions: PermissionSet,
    /// Ordered list of contributing (role, level) sources
    pub granted_by: Vec<GrantSource>,
    /// Flips company -> unit on the first unit contribution, never back
    pub highest_level: GrantLevel,
}

impl ResolvedModulePermission {
    pub fn company_scoped() -> Self {
        Self {
            permissions: PermissionSet::default(),
            granted_by: Vec::new(),
            highest_level: GrantLevel::Company,
        }
    }

    /// Fold one contribution into the resolution
    pub fn apply(&mut self, bits: PermissionSet, source: GrantSource) {
        self.permissions.merge(bits);
        if source.level == GrantLevel::Unit {
            self.highest_level = GrantLevel::Unit;
        }
        self.granted_by.push(source);
    }
}

/// Company-scope resolution: the subscription-filtered permission map for
/// one user, with the raw grant rows kept for provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPermissions {
    pub user_id: i64,
    pub company_id: Option<i64>,
    pub role_names: Vec<String>,
    pub grants: Vec<ModuleGrant>,
    pub permissions: HashMap<i64, PermissionSet>,
}

impl CompanyPermissions {
    /// Build the OR-merged map from raw grant rows
    pub fn new(
        user_id: i64,
        company_id: Option<i64>,
        role_names: Vec<String>,
        grants: Vec<ModuleGrant>,
    ) -> Self {
        let mut permissions: HashMap<i64, PermissionSet> = HashMap::new();
        for grant in &grants {
            permissions
                .entry(grant.module_id)
                .or_default()
                .merge(grant.bits());
        }

        Self {
            user_id,
            company_id,
            role_names,
            grants,
            permissions,
        }
    }

    pub fn allows(&self, module_id: i64, kind: PermissionKind) -> bool {
        self.permissions
            .get(&module_id)
            .is_some_and(|set| set.allows(kind))
    }
}

/// Administrative scope derived from the user's role names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLevels {
    pub is_unit_admin: bool,
    pub is_branch_admin: bool,
    pub is_company_admin: bool,
}

impl AdminLevels {
    /// OR-merge scope flags from another rule
    pub fn merge(&mut self, other: AdminLevels) {
        self.is_unit_admin |= other.is_unit_admin;
        self.is_branch_admin |= other.is_branch_admin;
        self.is_company_admin |= other.is_company_admin;
    }
}

/// A unit-role binding surfaced in the resolved context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRoleSummary {
    pub unit_id: i64,
    pub unit_name: String,
    pub role_name: String,
}

/// Immutable resolution snapshot for one user, serialized as the
/// "my unit context" response. Nothing here is persisted or cached; every
/// resolution re-derives it from current relational state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitContext {
    pub user_id: i64,
    pub company_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    pub effective_units: Vec<i64>,
    pub unit_roles: Vec<UnitRoleSummary>,
    pub admin_levels: AdminLevels,
    pub permissions: HashMap<i64, ResolvedModulePermission>,
}
