//! Common test utilities
//!
//! An in-memory store that implements every repository trait plus the
//! session store, emulating the SQL semantics of the production impls, and
//! a `TestState` wiring the full resolver stack over it. Lets the whole
//! engine run end to end without a database.

use accesshub_core::config::{AccessPolicyConfig, Config, DatabaseConfig};
use accesshub_core::domain::{
    Module, ModuleGrant, PlanModule, Role, RoleModule, Subscription, Unit, UnitModuleGrant,
    UnitPermissionEntry, UnitRoleBinding, UnitRoleBindingDetail, UnitRoleModule,
    UserRoleBinding,
};
use accesshub_core::error::{AppError, Result};
use accesshub_core::policy::{AdminRoleMatrix, ReservedModulePolicy};
use accesshub_core::repository::{
    ModuleCatalogRepository, RoleAssignmentRepository, SubscriptionRepository,
    UnitHierarchyRepository, UnitRoleRepository,
};
use accesshub_core::service::{
    AccessDecisionPoint, BasicPermissionResolver, EffectiveUnitResolver, UnitPermissionResolver,
    UnitRoleService,
};
use accesshub_core::session::{SessionIdentity, SessionStore};
use accesshub_core::state::HasAccessControl;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Data {
    modules: Vec<Module>,
    roles: Vec<Role>,
    role_modules: Vec<RoleModule>,
    user_bindings: Vec<UserRoleBinding>,
    branches: Vec<(i64, i64)>, // (branch_id, company_id)
    units: Vec<Unit>,
    unit_role_bindings: Vec<UnitRoleBinding>,
    unit_role_modules: Vec<UnitRoleModule>,
    plan_modules: Vec<PlanModule>,
    subscriptions: Vec<Subscription>,
    tokens: HashMap<String, SessionIdentity>,
    next_id: i64,
    fail_entitled: bool,
    fail_basic: bool,
}

impl Data {
    fn active_role_ids_of(&self, user_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .user_bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| {
                self.roles
                    .iter()
                    .any(|r| r.id == b.role_id && r.is_active)
            })
            .map(|b| b.role_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn role_name(&self, role_id: i64) -> String {
        self.roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .unwrap_or_default()
    }

    fn unit_name(&self, unit_id: i64) -> String {
        self.units
            .iter()
            .find(|u| u.id == unit_id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn plan_includes(&self, plan_id: i64, module_id: i64) -> bool {
        self.plan_modules
            .iter()
            .any(|pm| pm.plan_id == plan_id && pm.module_id == module_id && pm.is_included)
    }

    fn active_subscription(&self, company_id: i64, now: DateTime<Utc>) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|s| s.company_id == company_id && s.is_active_at(now))
    }
}

pub struct InMemoryStore {
    inner: Mutex<Data>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Data {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&self, id: i64, category: &str, tier: Option<&str>, is_active: bool) {
        self.inner.lock().unwrap().modules.push(Module {
            id,
            category: category.to_string(),
            parent_id: None,
            subscription_tier: tier.map(str::to_string),
            is_active,
        });
    }

    pub fn add_role(&self, id: i64, name: &str) {
        self.inner.lock().unwrap().roles.push(Role {
            id,
            name: name.to_string(),
            is_active: true,
        });
    }

    pub fn grant_role_module(
        &self,
        role_id: i64,
        module_id: i64,
        bits: (bool, bool, bool, bool),
    ) {
        self.inner.lock().unwrap().role_modules.push(RoleModule {
            role_id,
            module_id,
            can_read: bits.0,
            can_write: bits.1,
            can_delete: bits.2,
            can_approve: bits.3,
        });
    }

    pub fn bind_user(
        &self,
        user_id: i64,
        role_id: i64,
        company_id: i64,
        branch_id: Option<i64>,
        unit_id: Option<i64>,
    ) {
        let mut data = self.inner.lock().unwrap();
        data.next_id += 1;
        let id = data.next_id;
        data.user_bindings.push(UserRoleBinding {
            id,
            user_id,
            role_id,
            company_id,
            branch_id,
            unit_id,
        });
    }

    pub fn add_branch(&self, branch_id: i64, company_id: i64) {
        self.inner.lock().unwrap().branches.push((branch_id, company_id));
    }

    pub fn add_unit(&self, id: i64, branch_id: i64, parent_id: Option<i64>, is_active: bool) {
        self.inner.lock().unwrap().units.push(Unit {
            id,
            name: format!("Unit {}", id),
            branch_id,
            parent_id,
            level: 0,
            path: String::new(),
            is_active,
        });
    }

    /// Bind a role to a unit, returning the binding ID
    pub fn bind_unit_role(&self, unit_id: i64, role_id: i64) -> i64 {
        let mut data = self.inner.lock().unwrap();
        data.next_id += 1;
        let id = data.next_id;
        data.unit_role_bindings.push(UnitRoleBinding {
            id,
            unit_id,
            role_id,
        });
        id
    }

    pub fn grant_unit_role_module(
        &self,
        binding_id: i64,
        module_id: i64,
        bits: (bool, bool, bool, bool),
    ) {
        let mut data = self.inner.lock().unwrap();
        data.next_id += 1;
        let id = data.next_id;
        data.unit_role_modules.push(UnitRoleModule {
            id,
            unit_role_binding_id: binding_id,
            module_id,
            can_read: bits.0,
            can_write: bits.1,
            can_delete: bits.2,
            can_approve: bits.3,
        });
    }

    pub fn add_subscription(
        &self,
        company_id: i64,
        plan_id: i64,
        status: &str,
        end_date: Option<DateTime<Utc>>,
        included_modules: &[i64],
    ) {
        let mut data = self.inner.lock().unwrap();
        data.next_id += 1;
        let id = data.next_id;
        data.subscriptions.push(Subscription {
            id,
            company_id,
            plan_id,
            status: status.to_string(),
            start_date: Utc::now() - chrono::Duration::days(30),
            end_date,
        });
        for &module_id in included_modules {
            data.plan_modules.push(PlanModule {
                plan_id,
                module_id,
                is_included: true,
            });
        }
    }

    pub fn add_token(&self, token: &str, user_id: i64) {
        self.inner.lock().unwrap().tokens.insert(
            token.to_string(),
            SessionIdentity {
                user_id,
                expires_at: None,
                abilities: vec!["*".to_string()],
            },
        );
    }

    pub fn add_expired_token(&self, token: &str, user_id: i64) {
        self.inner.lock().unwrap().tokens.insert(
            token.to_string(),
            SessionIdentity {
                user_id,
                expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
                abilities: vec![],
            },
        );
    }

    pub fn fail_entitled_lookups(&self) {
        self.inner.lock().unwrap().fail_entitled = true;
    }

    pub fn fail_basic_lookups(&self) {
        self.inner.lock().unwrap().fail_basic = true;
    }

    /// Raw permission rows of a unit-role binding, for write-path asserts
    pub fn unit_role_rows(&self, binding_id: i64) -> Vec<UnitRoleModule> {
        self.inner
            .lock()
            .unwrap()
            .unit_role_modules
            .iter()
            .filter(|row| row.unit_role_binding_id == binding_id)
            .cloned()
            .collect()
    }

    pub fn binding_id_for(&self, unit_id: i64, role_id: i64) -> Option<i64> {
        self.inner
            .lock()
            .unwrap()
            .unit_role_bindings
            .iter()
            .find(|b| b.unit_id == unit_id && b.role_id == role_id)
            .map(|b| b.id)
    }
}

#[async_trait]
impl ModuleCatalogRepository for InMemoryStore {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Module>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .modules
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryStore {
    async fn find_role_names(&self, user_id: i64) -> Result<Vec<String>> {
        let data = self.inner.lock().unwrap();
        let mut names: Vec<String> = data
            .active_role_ids_of(user_id)
            .into_iter()
            .map(|id| data.role_name(id))
            .collect();
        names.dedup();
        Ok(names)
    }

    async fn find_role_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let data = self.inner.lock().unwrap();
        Ok(data.active_role_ids_of(user_id))
    }

    async fn find_company_for_user(&self, user_id: i64) -> Result<Option<i64>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .user_bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .min_by_key(|b| b.id)
            .map(|b| b.company_id))
    }

    async fn find_primary_binding(&self, user_id: i64) -> Result<Option<UserRoleBinding>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .user_bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .min_by_key(|b| b.id)
            .cloned())
    }

    async fn find_bound_unit_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let data = self.inner.lock().unwrap();
        let mut ids: Vec<i64> = data
            .user_bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| b.unit_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_entitled_grants(
        &self,
        user_id: i64,
        company_id: i64,
    ) -> Result<Vec<ModuleGrant>> {
        let data = self.inner.lock().unwrap();
        if data.fail_entitled {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        let now = Utc::now();
        let Some(subscription) = data.active_subscription(company_id, now) else {
            return Ok(vec![]);
        };
        let plan_id = subscription.plan_id;

        let role_ids = data.active_role_ids_of(user_id);
        let mut grants = vec![];
        for rm in &data.role_modules {
            if !role_ids.contains(&rm.role_id) {
                continue;
            }
            let Some(module) = data.modules.iter().find(|m| m.id == rm.module_id) else {
                continue;
            };
            if !module.is_active || !data.plan_includes(plan_id, module.id) {
                continue;
            }
            grants.push(ModuleGrant {
                module_id: rm.module_id,
                role_id: rm.role_id,
                role_name: data.role_name(rm.role_id),
                can_read: rm.can_read,
                can_write: rm.can_write,
                can_delete: rm.can_delete,
                can_approve: rm.can_approve,
            });
        }
        Ok(grants)
    }

    async fn find_basic_tier_grants(&self, user_id: i64) -> Result<Vec<ModuleGrant>> {
        let data = self.inner.lock().unwrap();
        if data.fail_basic {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        let role_ids = data.active_role_ids_of(user_id);
        let mut grants = vec![];
        for rm in &data.role_modules {
            if !role_ids.contains(&rm.role_id) {
                continue;
            }
            let Some(module) = data.modules.iter().find(|m| m.id == rm.module_id) else {
                continue;
            };
            if !module.is_active || !module.is_basic_tier() {
                continue;
            }
            grants.push(ModuleGrant {
                module_id: rm.module_id,
                role_id: rm.role_id,
                role_name: data.role_name(rm.role_id),
                can_read: rm.can_read,
                can_write: rm.can_write,
                can_delete: rm.can_delete,
                can_approve: rm.can_approve,
            });
        }
        Ok(grants)
    }
}

#[async_trait]
impl UnitHierarchyRepository for InMemoryStore {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Unit>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .units
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_company_units(&self, company_id: i64) -> Result<Vec<Unit>> {
        let data = self.inner.lock().unwrap();
        let branch_ids: Vec<i64> = data
            .branches
            .iter()
            .filter(|(_, cid)| *cid == company_id)
            .map(|(bid, _)| *bid)
            .collect();
        Ok(data
            .units
            .iter()
            .filter(|u| u.is_active && branch_ids.contains(&u.branch_id))
            .cloned()
            .collect())
    }

    async fn list_branch_units(&self, branch_id: i64) -> Result<Vec<Unit>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .units
            .iter()
            .filter(|u| u.is_active && u.branch_id == branch_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitRoleRepository for InMemoryStore {
    async fn find_bindings_for_units(
        &self,
        unit_ids: &[i64],
    ) -> Result<Vec<UnitRoleBindingDetail>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .unit_role_bindings
            .iter()
            .filter(|b| unit_ids.contains(&b.unit_id))
            .map(|b| UnitRoleBindingDetail {
                binding_id: b.id,
                unit_id: b.unit_id,
                unit_name: data.unit_name(b.unit_id),
                role_id: b.role_id,
                role_name: data.role_name(b.role_id),
            })
            .collect())
    }

    async fn find_grants_for_units(&self, unit_ids: &[i64]) -> Result<Vec<UnitModuleGrant>> {
        let data = self.inner.lock().unwrap();
        let mut grants = vec![];
        for row in &data.unit_role_modules {
            let Some(binding) = data
                .unit_role_bindings
                .iter()
                .find(|b| b.id == row.unit_role_binding_id)
            else {
                continue;
            };
            if !unit_ids.contains(&binding.unit_id) {
                continue;
            }
            grants.push(UnitModuleGrant {
                module_id: row.module_id,
                role_name: data.role_name(binding.role_id),
                unit_id: binding.unit_id,
                unit_name: data.unit_name(binding.unit_id),
                can_read: row.can_read,
                can_write: row.can_write,
                can_delete: row.can_delete,
                can_approve: row.can_approve,
            });
        }
        Ok(grants)
    }

    async fn find_binding_by_id(&self, id: i64) -> Result<Option<UnitRoleBinding>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .unit_role_bindings
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn upsert_permissions(
        &self,
        binding_id: i64,
        entries: &[UnitPermissionEntry],
    ) -> Result<()> {
        let mut data = self.inner.lock().unwrap();
        data.unit_role_modules
            .retain(|row| row.unit_role_binding_id != binding_id);
        for entry in entries {
            data.next_id += 1;
            let id = data.next_id;
            data.unit_role_modules.push(UnitRoleModule {
                id,
                unit_role_binding_id: binding_id,
                module_id: entry.module_id,
                can_read: entry.can_read,
                can_write: entry.can_write,
                can_delete: entry.can_delete,
                can_approve: entry.can_approve,
            });
        }
        Ok(())
    }

    async fn copy_permissions(
        &self,
        source_unit_id: i64,
        target_unit_id: i64,
        role_id: i64,
        overwrite_existing: bool,
    ) -> Result<u64> {
        let mut data = self.inner.lock().unwrap();

        let source_binding_id = data
            .unit_role_bindings
            .iter()
            .find(|b| b.unit_id == source_unit_id && b.role_id == role_id)
            .map(|b| b.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Role {} is not bound to unit {}",
                    role_id, source_unit_id
                ))
            })?;

        let target_binding_id = match data
            .unit_role_bindings
            .iter()
            .find(|b| b.unit_id == target_unit_id && b.role_id == role_id)
            .map(|b| b.id)
        {
            Some(id) => id,
            None => {
                data.next_id += 1;
                let id = data.next_id;
                data.unit_role_bindings.push(UnitRoleBinding {
                    id,
                    unit_id: target_unit_id,
                    role_id,
                });
                id
            }
        };

        let source_rows: Vec<UnitRoleModule> = data
            .unit_role_modules
            .iter()
            .filter(|row| row.unit_role_binding_id == source_binding_id)
            .cloned()
            .collect();

        let mut written = 0u64;
        for source_row in source_rows {
            let position = data.unit_role_modules.iter().position(|row| {
                row.unit_role_binding_id == target_binding_id
                    && row.module_id == source_row.module_id
            });

            match position {
                Some(index) if overwrite_existing => {
                    let row = &mut data.unit_role_modules[index];
                    let changed = (row.can_read, row.can_write, row.can_delete, row.can_approve)
                        != (
                            source_row.can_read,
                            source_row.can_write,
                            source_row.can_delete,
                            source_row.can_approve,
                        );
                    row.can_read = source_row.can_read;
                    row.can_write = source_row.can_write;
                    row.can_delete = source_row.can_delete;
                    row.can_approve = source_row.can_approve;
                    if changed {
                        written += 1;
                    }
                }
                Some(_) => {}
                None => {
                    data.next_id += 1;
                    let id = data.next_id;
                    data.unit_role_modules.push(UnitRoleModule {
                        id,
                        unit_role_binding_id: target_binding_id,
                        module_id: source_row.module_id,
                        can_read: source_row.can_read,
                        can_write: source_row.can_write,
                        can_delete: source_row.can_delete,
                        can_approve: source_row.can_approve,
                    });
                    written += 1;
                }
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn validate_token(&self, token: &str) -> Result<Option<SessionIdentity>> {
        let data = self.inner.lock().unwrap();
        let Some(identity) = data.tokens.get(token) else {
            return Ok(None);
        };
        if identity.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(identity.clone()))
    }
}

type TestAccessDecision = AccessDecisionPoint<
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
>;

/// Test implementation of the application state over the in-memory store
#[derive(Clone)]
pub struct TestState {
    pub store: Arc<InMemoryStore>,
    config: Arc<Config>,
    access_decision: Arc<TestAccessDecision>,
    unit_role_service: Arc<UnitRoleService<InMemoryStore, InMemoryStore>>,
}

impl TestState {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        let basic = Arc::new(BasicPermissionResolver::new(
            store.clone(),
            store.clone(),
            store.clone(),
            ReservedModulePolicy::default(),
        ));
        let effective = Arc::new(EffectiveUnitResolver::new(store.clone(), store.clone()));
        let units = Arc::new(UnitPermissionResolver::new(
            basic.clone(),
            effective,
            store.clone(),
            store.clone(),
            store.clone(),
            AdminRoleMatrix::default(),
        ));

        let config = Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 0,
            database: DatabaseConfig {
                url: "mysql://unused".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            access_policy: AccessPolicyConfig::default(),
        };

        Self {
            config: Arc::new(config),
            access_decision: Arc::new(AccessDecisionPoint::new(basic, units)),
            unit_role_service: Arc::new(UnitRoleService::new(store.clone(), store.clone())),
            store,
        }
    }
}

impl HasAccessControl for TestState {
    type Roles = InMemoryStore;
    type Subscriptions = InMemoryStore;
    type Modules = InMemoryStore;
    type Units = InMemoryStore;
    type UnitRoles = InMemoryStore;
    type Sessions = InMemoryStore;

    fn config(&self) -> &Config {
        &self.config
    }

    fn access_decision(&self) -> &TestAccessDecision {
        &self.access_decision
    }

    fn unit_role_service(&self) -> &UnitRoleService<InMemoryStore, InMemoryStore> {
        &self.unit_role_service
    }

    fn session_store(&self) -> &InMemoryStore {
        &self.store
    }

    async fn check_ready(&self) -> bool {
        true
    }
}

/// Build a state over a fresh store
#[allow(dead_code)]
pub fn test_state() -> TestState {
    TestState::new(Arc::new(InMemoryStore::new()))
}
