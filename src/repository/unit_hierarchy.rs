//! Unit hierarchy repository

use crate::domain::Unit;
use crate::error::Result;
use crate::repository::sql_placeholders;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitHierarchyRepository: Send + Sync {
    /// Fetch units for a set of IDs. Used one frontier at a time by the
    /// bounded ancestor walk, so no recursive SQL is involved.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Unit>>;

    /// All active units of a company, across every branch
    async fn list_company_units(&self, company_id: i64) -> Result<Vec<Unit>>;

    /// All active units of one branch
    async fn list_branch_units(&self, branch_id: i64) -> Result<Vec<Unit>>;
}

pub struct UnitHierarchyRepositoryImpl {
    pool: MySqlPool,
}

impl UnitHierarchyRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitHierarchyRepository for UnitHierarchyRepositoryImpl {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Unit>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT id, name, branch_id, parent_id, level, path, is_active \
             FROM units WHERE id IN ({})",
            sql_placeholders(ids.len())
        );

        let mut query = sqlx::query_as::<_, Unit>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let units = query.fetch_all(&self.pool).await?;
        Ok(units)
    }

    async fn list_company_units(&self, company_id: i64) -> Result<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT u.id, u.name, u.branch_id, u.parent_id, u.level, u.path, u.is_active
            FROM units u
            INNER JOIN branches b ON b.id = u.branch_id
            WHERE b.company_id = ? AND u.is_active = 1
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    async fn list_branch_units(&self, branch_id: i64) -> Result<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(
            "SELECT id, name, branch_id, parent_id, level, path, is_active \
             FROM units WHERE branch_id = ? AND is_active = 1",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }
}
