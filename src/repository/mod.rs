//! Data access layer (Repository pattern)

pub mod module_catalog;
pub mod role_assignment;
pub mod subscription;
pub mod unit_hierarchy;
pub mod unit_role;

pub use module_catalog::ModuleCatalogRepository;
pub use role_assignment::RoleAssignmentRepository;
pub use subscription::SubscriptionRepository;
pub use unit_hierarchy::UnitHierarchyRepository;
pub use unit_role::UnitRoleRepository;

/// Placeholder list for MySQL `IN (...)` clauses
pub(crate) fn sql_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
