//! Subscription-filtered grant repository

use crate::domain::ModuleGrant;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Company-level module grants for the user's roles, filtered through
    /// the company's active, non-expired subscription: the plan must
    /// include the module and the module must be active.
    async fn find_entitled_grants(&self, user_id: i64, company_id: i64)
        -> Result<Vec<ModuleGrant>>;

    /// Fallback: the same grants restricted to basic/unset-tier active
    /// modules, with no subscription involved.
    async fn find_basic_tier_grants(&self, user_id: i64) -> Result<Vec<ModuleGrant>>;
}

pub struct SubscriptionRepositoryImpl {
    pool: MySqlPool,
}

impl SubscriptionRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionRepositoryImpl {
    async fn find_entitled_grants(
        &self,
        user_id: i64,
        company_id: i64,
    ) -> Result<Vec<ModuleGrant>> {
        let grants = sqlx::query_as::<_, ModuleGrant>(
            r#"
            SELECT DISTINCT rm.module_id, rm.role_id, r.name AS role_name,
                   rm.can_read, rm.can_write, rm.can_delete, rm.can_approve
            FROM role_modules rm
            INNER JOIN roles r ON r.id = rm.role_id AND r.is_active = 1
            INNER JOIN user_role_bindings urb ON urb.role_id = rm.role_id AND urb.user_id = ?
            INNER JOIN modules m ON m.id = rm.module_id AND m.is_active = 1
            INNER JOIN subscriptions s
                ON s.company_id = ?
               AND s.status = 'active'
               AND s.start_date <= NOW()
               AND (s.end_date IS NULL OR s.end_date > NOW())
            INNER JOIN plan_modules pm
                ON pm.plan_id = s.plan_id
               AND pm.module_id = m.id
               AND pm.is_included = 1
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    async fn find_basic_tier_grants(&self, user_id: i64) -> Result<Vec<ModuleGrant>> {
        let grants = sqlx::query_as::<_, ModuleGrant>(
            r#"
            SELECT DISTINCT rm.module_id, rm.role_id, r.name AS role_name,
                   rm.can_read, rm.can_write, rm.can_delete, rm.can_approve
            FROM role_modules rm
            INNER JOIN roles r ON r.id = rm.role_id AND r.is_active = 1
            INNER JOIN user_role_bindings urb ON urb.role_id = rm.role_id AND urb.user_id = ?
            INNER JOIN modules m ON m.id = rm.module_id AND m.is_active = 1
            WHERE m.subscription_tier IS NULL
               OR m.subscription_tier = ''
               OR m.subscription_tier = 'basic'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }
}
