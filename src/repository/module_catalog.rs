//! Module catalog repository

use crate::domain::Module;
use crate::error::Result;
use crate::repository::sql_placeholders;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModuleCatalogRepository: Send + Sync {
    /// Fetch module metadata for a set of IDs (order unspecified)
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Module>>;
}

pub struct ModuleCatalogRepositoryImpl {
    pool: MySqlPool,
}

impl ModuleCatalogRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModuleCatalogRepository for ModuleCatalogRepositoryImpl {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Module>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT id, category, parent_id, subscription_tier, is_active \
             FROM modules WHERE id IN ({})",
            sql_placeholders(ids.len())
        );

        let mut query = sqlx::query_as::<_, Module>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let modules = query.fetch_all(&self.pool).await?;
        Ok(modules)
    }
}
