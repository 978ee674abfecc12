//! Domain models for the permission engine

pub mod module;
pub mod permission;
pub mod role;
pub mod subscription;
pub mod unit;

pub use module::{AccessibleModule, Module, ModuleFilter, PagedModules, BASIC_TIER};
pub use permission::{
    AdminLevels, CompanyPermissions, GrantLevel, GrantSource, GrantSourceType,
    InvalidPermissionKind, PermissionKind, PermissionSet, ResolvedModulePermission, UnitContext,
    UnitRoleSummary,
};
pub use role::{ModuleGrant, Role, RoleModule, UserRoleBinding};
pub use subscription::{
    PlanModule, Subscription, SubscriptionPlan, SUBSCRIPTION_STATUS_ACTIVE,
};
pub use unit::{
    CopyUnitPermissionsInput, Unit, UnitModuleGrant, UnitPermissionEntry, UnitRoleBinding,
    UnitRoleBindingDetail, UnitRoleModule, UpsertUnitPermissionsInput,
};
