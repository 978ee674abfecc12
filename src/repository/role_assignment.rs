//! User role-assignment repository

use crate::domain::UserRoleBinding;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Distinct names of the active roles a user holds, across all bindings
    async fn find_role_names(&self, user_id: i64) -> Result<Vec<String>>;

    /// Distinct IDs of the active roles a user holds
    async fn find_role_ids(&self, user_id: i64) -> Result<Vec<i64>>;

    /// The single company a resolution runs against: the first one found
    /// via any binding. A user spanning multiple companies gets only this
    /// company's subscription context (known limitation, kept as-is).
    async fn find_company_for_user(&self, user_id: i64) -> Result<Option<i64>>;

    /// The user's first binding, carrying the primary branch/unit linkage
    async fn find_primary_binding(&self, user_id: i64) -> Result<Option<UserRoleBinding>>;

    /// Distinct unit IDs the user is directly bound to. These seed the
    /// effective-unit closure; they never scope company-level grants.
    async fn find_bound_unit_ids(&self, user_id: i64) -> Result<Vec<i64>>;
}

pub struct RoleAssignmentRepositoryImpl {
    pool: MySqlPool,
}

impl RoleAssignmentRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleAssignmentRepository for RoleAssignmentRepositoryImpl {
    async fn find_role_names(&self, user_id: i64) -> Result<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.name
            FROM roles r
            INNER JOIN user_role_bindings urb ON r.id = urb.role_id
            WHERE urb.user_id = ? AND r.is_active = 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn find_role_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.id
            FROM roles r
            INNER JOIN user_role_bindings urb ON r.id = urb.role_id
            WHERE urb.user_id = ? AND r.is_active = 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn find_company_for_user(&self, user_id: i64) -> Result<Option<i64>> {
        let company: Option<(i64,)> = sqlx::query_as(
            "SELECT company_id FROM user_role_bindings WHERE user_id = ? ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company.map(|(id,)| id))
    }

    async fn find_primary_binding(&self, user_id: i64) -> Result<Option<UserRoleBinding>> {
        let binding = sqlx::query_as::<_, UserRoleBinding>(
            r#"
            SELECT id, user_id, role_id, company_id, branch_id, unit_id
            FROM user_role_bindings
            WHERE user_id = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(binding)
    }

    async fn find_bound_unit_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT unit_id
            FROM user_role_bindings
            WHERE user_id = ? AND unit_id IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
