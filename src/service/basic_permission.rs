//! Company-scope permission resolution
//!
//! Subscription-aware: company-level grants only count when the company's
//! active subscription plan includes the module. When the entitled lookup
//! errors or comes back empty, resolution falls open to the basic tier
//! rather than failing closed; a failure of the fallback itself is a
//! resolution failure.

use crate::domain::{
    AccessibleModule, CompanyPermissions, Module, ModuleFilter, ModuleGrant, PagedModules,
    PermissionKind, PermissionSet,
};
use crate::error::Result;
use crate::policy::{ReservedModulePolicy, SUPER_ADMIN_ROLE};
use crate::repository::{
    ModuleCatalogRepository, RoleAssignmentRepository, SubscriptionRepository,
};
use std::sync::Arc;

pub struct BasicPermissionResolver<R, S, M>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
{
    roles: Arc<R>,
    subscriptions: Arc<S>,
    modules: Arc<M>,
    reserved_policy: ReservedModulePolicy,
}

impl<R, S, M> BasicPermissionResolver<R, S, M>
where
    R: RoleAssignmentRepository,
    S: SubscriptionRepository,
    M: ModuleCatalogRepository,
{
    pub fn new(
        roles: Arc<R>,
        subscriptions: Arc<S>,
        modules: Arc<M>,
        reserved_policy: ReservedModulePolicy,
    ) -> Self {
        Self {
            roles,
            subscriptions,
            modules,
            reserved_policy,
        }
    }

    pub fn reserved_policy(&self) -> &ReservedModulePolicy {
        &self.reserved_policy
    }

    /// Resolve the company-scope permission map for a user.
    ///
    /// Issues the role-name, company and grant queries sequentially with no
    /// enclosing transaction; permission data changes far less often than
    /// it is read, so read skew across the queries is accepted.
    pub async fn resolve(&self, user_id: i64) -> Result<CompanyPermissions> {
        let role_names = self.roles.find_role_names(user_id).await?;
        let company_id = self.roles.find_company_for_user(user_id).await?;
        let grants = self.load_grants(user_id, company_id).await?;

        Ok(CompanyPermissions::new(
            user_id, company_id, role_names, grants,
        ))
    }

    async fn load_grants(&self, user_id: i64, company_id: Option<i64>) -> Result<Vec<ModuleGrant>> {
        if let Some(company_id) = company_id {
            match self
                .subscriptions
                .find_entitled_grants(user_id, company_id)
                .await
            {
                Ok(grants) if !grants.is_empty() => return Ok(grants),
                Ok(_) => {
                    tracing::debug!(user_id, company_id, "no entitled grants, using basic tier");
                }
                Err(err) => {
                    tracing::warn!(
                        user_id,
                        company_id,
                        error = %err,
                        "entitled grant lookup failed, falling back to basic tier"
                    );
                }
            }
        }

        self.subscriptions.find_basic_tier_grants(user_id).await
    }

    /// Check one permission bit for one module. Reserved grants are
    /// consulted first and bypass the resolved map entirely; otherwise an
    /// absent module means deny.
    pub async fn has_permission(
        &self,
        user_id: i64,
        module_id: i64,
        kind: PermissionKind,
    ) -> Result<bool> {
        let role_ids = self.roles.find_role_ids(user_id).await?;
        if self.reserved_policy.grants_override(&role_ids, module_id) {
            tracing::debug!(user_id, module_id, "reserved grant override applied");
            return Ok(true);
        }

        let resolved = self.resolve(user_id).await?;
        Ok(resolved.allows(module_id, kind))
    }

    /// Exact string match against the user's role names
    pub async fn has_role(&self, user_id: i64, role_name: &str) -> Result<bool> {
        let names = self.roles.find_role_names(user_id).await?;
        Ok(names.iter().any(|name| name == role_name))
    }

    pub async fn is_super_admin(&self, user_id: i64) -> Result<bool> {
        self.has_role(user_id, SUPER_ADMIN_ROLE).await
    }

    /// Active modules the user holds the given bit on
    pub async fn get_accessible_modules(
        &self,
        user_id: i64,
        kind: PermissionKind,
    ) -> Result<Vec<AccessibleModule>> {
        let accessible = self.load_accessible(user_id, kind).await?;
        Ok(accessible
            .into_iter()
            .filter(|(module, _)| module.is_active)
            .map(|(module, bits)| AccessibleModule::new(module, bits))
            .collect())
    }

    /// Filtered, paginated module listing.
    ///
    /// The full permission map is resolved and filtered in memory before
    /// the page is cut, so cost tracks total accessible modules rather
    /// than page size.
    pub async fn get_filtered_modules(
        &self,
        user_id: i64,
        kind: PermissionKind,
        filter: &ModuleFilter,
        page: i64,
        per_page: i64,
    ) -> Result<PagedModules> {
        let mut matches: Vec<(Module, PermissionSet)> = self
            .load_accessible(user_id, kind)
            .await?
            .into_iter()
            .filter(|(module, _)| filter.include_inactive || module.is_active)
            .filter(|(module, _)| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| module.category == category)
            })
            .filter(|(module, _)| {
                filter.search.as_deref().is_none_or(|needle| {
                    module
                        .category
                        .to_lowercase()
                        .contains(&needle.to_lowercase())
                })
            })
            .collect();
        matches.sort_by_key(|(module, _)| module.id);

        let total = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .map(|(module, bits)| AccessibleModule::new(module, bits))
            .collect();

        Ok(PagedModules {
            items,
            total,
            page,
            per_page,
        })
    }

    async fn load_accessible(
        &self,
        user_id: i64,
        kind: PermissionKind,
    ) -> Result<Vec<(Module, PermissionSet)>> {
        let resolved = self.resolve(user_id).await?;
        let ids: Vec<i64> = resolved
            .permissions
            .iter()
            .filter(|(_, set)| set.allows(kind))
            .map(|(id, _)| *id)
            .collect();

        let modules = self.modules.find_by_ids(&ids).await?;
        Ok(modules
            .into_iter()
            .map(|module| {
                let bits = resolved.permissions[&module.id];
                (module, bits)
            })
            .collect())
    }
}
