//! Access decision façade
//!
//! The one surface middleware and handlers talk to. Two parallel families:
//! the basic (company-only) API behind plain authentication, and the
//! unit-aware API behind unit-aware authentication. Everything here is
//! read-only; store errors propagate except the documented basic-tier
//! fallback inside the company-scope resolution.

use crate::domain::{
    AccessibleModule, ModuleFilter, PagedModules, PermissionKind, Unit, UnitContext,
};
use crate::error::Result;
use crate::policy::ReservedGrant;
use crate::repository::{
    ModuleCatalogRepository, RoleAssignmentRepository, SubscriptionRepository,
    UnitHierarchyRepository, UnitRoleRepository,
};
use crate::service::{BasicPermissionResolver, UnitPermissionResolver};
use std::sync::Arc;

pub struct AccessDecisionPoint<R, S, M, U, UR>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    basic: Arc<BasicPermissionResolver<R, S, M>>,
    units: Arc<UnitPermissionResolver<R, S, M, U, UR>>,
}

impl<R, S, M, U, UR> AccessDecisionPoint<R, S, M, U, UR>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    pub fn new(
        basic: Arc<BasicPermissionResolver<R, S, M>>,
        units: Arc<UnitPermissionResolver<R, S, M, U, UR>>,
    ) -> Self {
        Self { basic, units }
    }

    // ==================== Basic (company-only) surface ====================

    pub async fn has_permission(
        &self,
        user_id: i64,
        module_id: i64,
        kind: PermissionKind,
    ) -> Result<bool> {
        self.basic.has_permission(user_id, module_id, kind).await
    }

    pub async fn has_role(&self, user_id: i64, role_name: &str) -> Result<bool> {
        self.basic.has_role(user_id, role_name).await
    }

    pub async fn is_super_admin(&self, user_id: i64) -> Result<bool> {
        self.basic.is_super_admin(user_id).await
    }

    pub async fn get_accessible_modules(
        &self,
        user_id: i64,
        kind: PermissionKind,
    ) -> Result<Vec<AccessibleModule>> {
        self.basic.get_accessible_modules(user_id, kind).await
    }

    pub async fn get_filtered_modules(
        &self,
        user_id: i64,
        kind: PermissionKind,
        filter: &ModuleFilter,
        page: i64,
        per_page: i64,
    ) -> Result<PagedModules> {
        self.basic
            .get_filtered_modules(user_id, kind, filter, page, per_page)
            .await
    }

    /// The reserved-grant table, for audit listings
    pub fn reserved_grants(&self) -> &[ReservedGrant] {
        self.basic.reserved_policy().entries()
    }

    // ==================== Unit-aware surface ====================

    pub async fn has_unit_permission(
        &self,
        user_id: i64,
        module_id: i64,
        kind: PermissionKind,
        unit_id: Option<i64>,
    ) -> Result<bool> {
        self.units
            .has_unit_permission(user_id, module_id, kind, unit_id)
            .await
    }

    pub async fn can_access_unit(&self, user_id: i64, unit_id: i64) -> Result<bool> {
        self.units.can_access_unit(user_id, unit_id).await
    }

    pub async fn get_accessible_units(&self, user_id: i64) -> Result<Vec<Unit>> {
        self.units.get_accessible_units(user_id).await
    }

    pub async fn get_user_unit_permissions(&self, user_id: i64) -> Result<UnitContext> {
        self.units.resolve_unit_context(user_id).await
    }
}
