//! Unit hierarchy and unit-scoped grant domain models

use super::permission::PermissionSet;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A unit inside a branch's tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub branch_id: i64,
    pub parent_id: Option<i64>,
    pub level: i32,
    pub path: String,
    pub is_active: bool,
}

/// A role bound directly to a unit, independent of any specific user.
///
/// Deliberately a separate relation from `UserRoleBinding`; the two get
/// conflated in conversation but never in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UnitRoleBinding {
    pub id: i64,
    pub unit_id: i64,
    pub role_id: i64,
}

/// Permission row scoped to one unit-role pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UnitRoleModule {
    pub id: i64,
    pub unit_role_binding_id: i64,
    pub module_id: i64,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_approve: bool,
}

/// Query row for a unit-scoped module grant reachable through the user's
/// effective units. Carries role and unit names for provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UnitModuleGrant {
    pub module_id: i64,
    pub role_name: String,
    pub unit_id: i64,
    pub unit_name: String,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_approve: bool,
}

impl UnitModuleGrant {
    pub fn bits(&self) -> PermissionSet {
        PermissionSet::new(self.can_read, self.can_write, self.can_delete, self.can_approve)
    }
}

/// Query row for a unit-role binding with resolved names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UnitRoleBindingDetail {
    pub binding_id: i64,
    pub unit_id: i64,
    pub unit_name: String,
    pub role_id: i64,
    pub role_name: String,
}

/// One permission row in a bulk upsert
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UnitPermissionEntry {
    #[validate(range(min = 1))]
    pub module_id: i64,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_approve: bool,
}

impl UnitPermissionEntry {
    pub fn bits(&self) -> PermissionSet {
        PermissionSet::new(self.can_read, self.can_write, self.can_delete, self.can_approve)
    }
}

/// Input for replacing a unit-role's permission rows in one transaction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertUnitPermissionsInput {
    #[validate(length(min = 1), nested)]
    pub entries: Vec<UnitPermissionEntry>,
}

/// Input for copying unit-role permissions between units
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CopyUnitPermissionsInput {
    #[validate(range(min = 1))]
    pub source_unit_id: i64,
    #[validate(range(min = 1))]
    pub role_id: i64,
    /// When false, existing target rows are left untouched
    #[serde(default)]
    pub overwrite_existing: bool,
}
