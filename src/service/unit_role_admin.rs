//! Unit-role permission administration (write path)
//!
//! The only mutations touching the permission model. Both operations are
//! atomic at the repository layer: an interrupted write must never leave a
//! unit-role with a partially applied permission set.

use crate::domain::{CopyUnitPermissionsInput, UpsertUnitPermissionsInput};
use crate::error::{AppError, Result};
use crate::repository::{UnitHierarchyRepository, UnitRoleRepository};
use std::sync::Arc;
use validator::Validate;

pub struct UnitRoleService<U, UR>
where
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    hierarchy: Arc<U>,
    unit_roles: Arc<UR>,
}

impl<U, UR> UnitRoleService<U, UR>
where
    U: UnitHierarchyRepository,
    UR: UnitRoleRepository,
{
    pub fn new(hierarchy: Arc<U>, unit_roles: Arc<UR>) -> Self {
        Self {
            hierarchy,
            unit_roles,
        }
    }

    /// Replace a unit-role binding's permission rows
    pub async fn upsert_permissions(
        &self,
        binding_id: i64,
        input: UpsertUnitPermissionsInput,
    ) -> Result<()> {
        input.validate()?;

        let _ = self
            .unit_roles
            .find_binding_by_id(binding_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Unit role binding {} not found", binding_id))
            })?;

        self.unit_roles
            .upsert_permissions(binding_id, &input.entries)
            .await?;

        tracing::info!(binding_id, entries = input.entries.len(), "unit role permissions replaced");
        Ok(())
    }

    /// Copy a role's permission rows from a source unit onto a target
    /// unit. Returns the number of rows written.
    pub async fn copy_permissions(
        &self,
        target_unit_id: i64,
        input: CopyUnitPermissionsInput,
    ) -> Result<u64> {
        input.validate()?;

        if input.source_unit_id == target_unit_id {
            return Err(AppError::BadRequest(
                "source and target unit must differ".to_string(),
            ));
        }

        let units = self
            .hierarchy
            .find_by_ids(&[input.source_unit_id, target_unit_id])
            .await?;
        for unit_id in [input.source_unit_id, target_unit_id] {
            if !units.iter().any(|unit| unit.id == unit_id) {
                return Err(AppError::NotFound(format!("Unit {} not found", unit_id)));
            }
        }

        let written = self
            .unit_roles
            .copy_permissions(
                input.source_unit_id,
                target_unit_id,
                input.role_id,
                input.overwrite_existing,
            )
            .await?;

        tracing::info!(
            source_unit_id = input.source_unit_id,
            target_unit_id,
            role_id = input.role_id,
            overwrite = input.overwrite_existing,
            written,
            "unit role permissions copied"
        );
        Ok(written)
    }
}
