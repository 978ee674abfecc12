//! Unit-role binding and unit-scoped grant repository
//!
//! Read path feeds the resolver; the two write operations run inside a
//! single transaction so a unit-role is never left with a partially
//! applied permission set.

use crate::domain::{
    UnitModuleGrant, UnitPermissionEntry, UnitRoleBinding, UnitRoleBindingDetail, UnitRoleModule,
};
use crate::error::{AppError, Result};
use crate::repository::sql_placeholders;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitRoleRepository: Send + Sync {
    /// Unit-role bindings attached to any of the given units, with
    /// resolved unit and role names
    async fn find_bindings_for_units(&self, unit_ids: &[i64])
        -> Result<Vec<UnitRoleBindingDetail>>;

    /// Unit-scoped module grants reachable through any of the given units
    async fn find_grants_for_units(&self, unit_ids: &[i64]) -> Result<Vec<UnitModuleGrant>>;

    async fn find_binding_by_id(&self, id: i64) -> Result<Option<UnitRoleBinding>>;

    /// Replace the binding's permission rows with `entries`, atomically
    async fn upsert_permissions(
        &self,
        binding_id: i64,
        entries: &[UnitPermissionEntry],
    ) -> Result<()>;

    /// Copy permission rows from the (source unit, role) binding to the
    /// (target unit, role) binding, creating the target binding if needed.
    /// With `overwrite_existing` false, rows already present on the target
    /// are left untouched. Returns the number of rows written.
    async fn copy_permissions(
        &self,
        source_unit_id: i64,
        target_unit_id: i64,
        role_id: i64,
        overwrite_existing: bool,
    ) -> Result<u64>;
}

pub struct UnitRoleRepositoryImpl {
    pool: MySqlPool,
}

impl UnitRoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitRoleRepository for UnitRoleRepositoryImpl {
    async fn find_bindings_for_units(
        &self,
        unit_ids: &[i64],
    ) -> Result<Vec<UnitRoleBindingDetail>> {
        if unit_ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            r#"
            SELECT urb.id AS binding_id, urb.unit_id, u.name AS unit_name,
                   urb.role_id, r.name AS role_name
            FROM unit_role_bindings urb
            INNER JOIN units u ON u.id = urb.unit_id
            INNER JOIN roles r ON r.id = urb.role_id AND r.is_active = 1
            WHERE urb.unit_id IN ({})
            "#,
            sql_placeholders(unit_ids.len())
        );

        let mut query = sqlx::query_as::<_, UnitRoleBindingDetail>(&sql);
        for id in unit_ids {
            query = query.bind(id);
        }

        let bindings = query.fetch_all(&self.pool).await?;
        Ok(bindings)
    }

    async fn find_grants_for_units(&self, unit_ids: &[i64]) -> Result<Vec<UnitModuleGrant>> {
        if unit_ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            r#"
            SELECT urm.module_id, r.name AS role_name, urb.unit_id, u.name AS unit_name,
                   urm.can_read, urm.can_write, urm.can_delete, urm.can_approve
            FROM unit_role_modules urm
            INNER JOIN unit_role_bindings urb ON urb.id = urm.unit_role_binding_id
            INNER JOIN units u ON u.id = urb.unit_id
            INNER JOIN roles r ON r.id = urb.role_id AND r.is_active = 1
            WHERE urb.unit_id IN ({})
            "#,
            sql_placeholders(unit_ids.len())
        );

        let mut query = sqlx::query_as::<_, UnitModuleGrant>(&sql);
        for id in unit_ids {
            query = query.bind(id);
        }

        let grants = query.fetch_all(&self.pool).await?;
        Ok(grants)
    }

    async fn find_binding_by_id(&self, id: i64) -> Result<Option<UnitRoleBinding>> {
        let binding = sqlx::query_as::<_, UnitRoleBinding>(
            "SELECT id, unit_id, role_id FROM unit_role_bindings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(binding)
    }

    async fn upsert_permissions(
        &self,
        binding_id: i64,
        entries: &[UnitPermissionEntry],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM unit_role_modules WHERE unit_role_binding_id = ?")
            .bind(binding_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO unit_role_modules
                    (unit_role_binding_id, module_id, can_read, can_write, can_delete, can_approve)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(binding_id)
            .bind(entry.module_id)
            .bind(entry.can_read)
            .bind(entry.can_write)
            .bind(entry.can_delete)
            .bind(entry.can_approve)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn copy_permissions(
        &self,
        source_unit_id: i64,
        target_unit_id: i64,
        role_id: i64,
        overwrite_existing: bool,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let source: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM unit_role_bindings WHERE unit_id = ? AND role_id = ?")
                .bind(source_unit_id)
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await?;

        let source_binding_id = source
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Role {} is not bound to unit {}",
                    role_id, source_unit_id
                ))
            })?
            .0;

        let target: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM unit_role_bindings WHERE unit_id = ? AND role_id = ?")
                .bind(target_unit_id)
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await?;

        let target_binding_id = match target {
            Some((id,)) => id,
            None => {
                let result =
                    sqlx::query("INSERT INTO unit_role_bindings (unit_id, role_id) VALUES (?, ?)")
                        .bind(target_unit_id)
                        .bind(role_id)
                        .execute(&mut *tx)
                        .await?;
                result.last_insert_id() as i64
            }
        };

        let rows = sqlx::query_as::<_, UnitRoleModule>(
            r#"
            SELECT id, unit_role_binding_id, module_id,
                   can_read, can_write, can_delete, can_approve
            FROM unit_role_modules
            WHERE unit_role_binding_id = ?
            "#,
        )
        .bind(source_binding_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut written = 0u64;
        for row in &rows {
            let result = if overwrite_existing {
                sqlx::query(
                    r#"
                    INSERT INTO unit_role_modules
                        (unit_role_binding_id, module_id, can_read, can_write, can_delete, can_approve)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE
                        can_read = VALUES(can_read),
                        can_write = VALUES(can_write),
                        can_delete = VALUES(can_delete),
                        can_approve = VALUES(can_approve)
                    "#,
                )
                .bind(target_binding_id)
                .bind(row.module_id)
                .bind(row.can_read)
                .bind(row.can_write)
                .bind(row.can_delete)
                .bind(row.can_approve)
                .execute(&mut *tx)
                .await?
            } else {
                sqlx::query(
                    r#"
                    INSERT IGNORE INTO unit_role_modules
                        (unit_role_binding_id, module_id, can_read, can_write, can_delete, can_approve)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(target_binding_id)
                .bind(row.module_id)
                .bind(row.can_read)
                .bind(row.can_write)
                .bind(row.can_delete)
                .bind(row.can_approve)
                .execute(&mut *tx)
                .await?
            };

            if result.rows_affected() > 0 {
                written += 1;
            }
        }

        tx.commit().await?;
        Ok(written)
    }
}
