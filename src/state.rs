//! Application state trait for dependency injection
//!
//! Abstracts the application state so the same handler and middleware code
//! works against the production `AppState` and test implementations built
//! on in-memory stores.

use crate::config::Config;
use crate::repository::{
    ModuleCatalogRepository, RoleAssignmentRepository, SubscriptionRepository,
    UnitHierarchyRepository, UnitRoleRepository,
};
use crate::service::{AccessDecisionPoint, UnitRoleService};
use crate::session::SessionStore;

/// Trait for application state that provides access to the permission
/// engine and its surrounding services.
pub trait HasAccessControl: Clone + Send + Sync + 'static {
    /// The role-assignment repository type
    type Roles: RoleAssignmentRepository;
    /// The subscription repository type
    type Subscriptions: SubscriptionRepository;
    /// The module catalog repository type
    type Modules: ModuleCatalogRepository;
    /// The unit hierarchy repository type
    type Units: UnitHierarchyRepository;
    /// The unit-role repository type
    type UnitRoles: UnitRoleRepository;
    /// The session store type
    type Sessions: SessionStore;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the access decision façade
    fn access_decision(
        &self,
    ) -> &AccessDecisionPoint<
        Self::Roles,
        Self::Subscriptions,
        Self::Modules,
        Self::Units,
        Self::UnitRoles,
    >;

    /// Get the unit-role administration service (write path)
    fn unit_role_service(&self) -> &UnitRoleService<Self::Units, Self::UnitRoles>;

    /// Get the session store
    fn session_store(&self) -> &Self::Sessions;

    /// Check whether the backing store is reachable
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
