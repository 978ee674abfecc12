//! Unit-aware permission resolution
//!
//! Merges the company-scope map with unit-scoped grants reachable through
//! the user's effective units, tracking provenance per module. Unit-level
//! grants are deliberately not run through the subscription filter: a unit
//! admin can expose a higher-tier module at unit scope irrespective of the
//! company's plan. Flagged for product confirmation; do not "fix" here.

use crate::domain::{
    GrantLevel, GrantSource, GrantSourceType, PermissionKind, ResolvedModulePermission, Unit,
    UnitContext, UnitRoleSummary,
};
use crate::error::Result;
use crate::policy::AdminRoleMatrix;
use crate::repository::{
    ModuleCatalogRepository, RoleAssignmentRepository, SubscriptionRepository,
    UnitHierarchyRepository, UnitRoleRepository,
};
use crate::service::{BasicPermissionResolver, EffectiveUnitResolver};
use std::collections::HashMap;
use std::sync::Arc;

pub struct UnitPermissionResolver<R, S, M, U, UR>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    basic: Arc<BasicPermissionResolver<R, S, M>>,
    effective: Arc<EffectiveUnitResolver<R, U>>,
    roles: Arc<R>,
    hierarchy: Arc<U>,
    unit_roles: Arc<UR>,
    admin_matrix: AdminRoleMatrix,
}

impl<R, S, M, U, UR> UnitPermissionResolver<R, S, M, U, UR>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    pub fn new(
        basic: Arc<BasicPermissionResolver<R, S, M>>,
        effective: Arc<EffectiveUnitResolver<R, U>>,
        roles: Arc<R>,
        hierarchy: Arc<U>,
        unit_roles: Arc<UR>,
        admin_matrix: AdminRoleMatrix,
    ) -> Self {
        Self {
            basic,
            effective,
            roles,
            hierarchy,
            unit_roles,
            admin_matrix,
        }
    }

    /// Resolve the full unit-aware snapshot for a user. Company-level
    /// contributions are folded in first, then unit-level ones, so
    /// provenance lists read company-before-unit per module.
    pub async fn resolve_unit_context(&self, user_id: i64) -> Result<UnitContext> {
        let company = self.basic.resolve(user_id).await?;

        let mut effective_units: Vec<i64> =
            self.effective.resolve(user_id).await?.into_iter().collect();
        effective_units.sort_unstable();

        let bindings = self
            .unit_roles
            .find_bindings_for_units(&effective_units)
            .await?;
        let unit_grants = self
            .unit_roles
            .find_grants_for_units(&effective_units)
            .await?;

        let mut permissions: HashMap<i64, ResolvedModulePermission> = HashMap::new();

        for grant in &company.grants {
            permissions
                .entry(grant.module_id)
                .or_insert_with(ResolvedModulePermission::company_scoped)
                .apply(
                    grant.bits(),
                    GrantSource {
                        source_type: GrantSourceType::Role,
                        role_name: grant.role_name.clone(),
                        unit_id: None,
                        unit_name: None,
                        level: GrantLevel::Company,
                    },
                );
        }

        for grant in &unit_grants {
            permissions
                .entry(grant.module_id)
                .or_insert_with(ResolvedModulePermission::company_scoped)
                .apply(
                    grant.bits(),
                    GrantSource {
                        source_type: GrantSourceType::UnitRole,
                        role_name: grant.role_name.clone(),
                        unit_id: Some(grant.unit_id),
                        unit_name: Some(grant.unit_name.clone()),
                        level: GrantLevel::Unit,
                    },
                );
        }

        let admin_levels = self.admin_matrix.levels_for(&company.role_names);
        let primary = self.roles.find_primary_binding(user_id).await?;

        Ok(UnitContext {
            user_id,
            company_id: company.company_id,
            branch_id: primary.as_ref().and_then(|binding| binding.branch_id),
            unit_id: primary.as_ref().and_then(|binding| binding.unit_id),
            effective_units,
            unit_roles: bindings
                .into_iter()
                .map(|binding| UnitRoleSummary {
                    unit_id: binding.unit_id,
                    unit_name: binding.unit_name,
                    role_name: binding.role_name,
                })
                .collect(),
            admin_levels,
            permissions,
        })
    }

    /// Check one bit on the merged map. With a concrete `unit_id` the unit
    /// must literally be among the user's effective units; admins get no
    /// shortcut here, unlike `can_access_unit`. Preserved as observed
    /// behavior, open question upstream.
    pub async fn has_unit_permission(
        &self,
        user_id: i64,
        module_id: i64,
        kind: PermissionKind,
        unit_id: Option<i64>,
    ) -> Result<bool> {
        let context = self.resolve_unit_context(user_id).await?;

        if let Some(unit_id) = unit_id {
            if !context.effective_units.contains(&unit_id) {
                return Ok(false);
            }
        }

        Ok(context
            .permissions
            .get(&module_id)
            .is_some_and(|resolved| resolved.permissions.allows(kind)))
    }

    /// Company admins reach every unit of their company, branch admins
    /// every unit of their primary branch, everyone else exactly their
    /// effective units.
    pub async fn can_access_unit(&self, user_id: i64, unit_id: i64) -> Result<bool> {
        let role_names = self.roles.find_role_names(user_id).await?;
        let levels = self.admin_matrix.levels_for(&role_names);

        if levels.is_company_admin {
            if let Some(company_id) = self.roles.find_company_for_user(user_id).await? {
                let units = self.hierarchy.list_company_units(company_id).await?;
                return Ok(units.iter().any(|unit| unit.id == unit_id));
            }
        }

        if levels.is_branch_admin {
            let branch_id = self
                .roles
                .find_primary_binding(user_id)
                .await?
                .and_then(|binding| binding.branch_id);
            if let Some(branch_id) = branch_id {
                let units = self.hierarchy.list_branch_units(branch_id).await?;
                return Ok(units.iter().any(|unit| unit.id == unit_id));
            }
        }

        Ok(self.effective.resolve(user_id).await?.contains(&unit_id))
    }

    /// Same precedence as `can_access_unit`. A non-admin bound across two
    /// branches never gets a cross-branch aggregate, only their closure.
    pub async fn get_accessible_units(&self, user_id: i64) -> Result<Vec<Unit>> {
        let role_names = self.roles.find_role_names(user_id).await?;
        let levels = self.admin_matrix.levels_for(&role_names);

        if levels.is_company_admin {
            if let Some(company_id) = self.roles.find_company_for_user(user_id).await? {
                return self.hierarchy.list_company_units(company_id).await;
            }
        }

        if levels.is_branch_admin {
            let branch_id = self
                .roles
                .find_primary_binding(user_id)
                .await?
                .and_then(|binding| binding.branch_id);
            if let Some(branch_id) = branch_id {
                return self.hierarchy.list_branch_units(branch_id).await;
            }
        }

        let mut effective: Vec<i64> = self.effective.resolve(user_id).await?.into_iter().collect();
        effective.sort_unstable();
        self.hierarchy.find_by_ids(&effective).await
    }
}
