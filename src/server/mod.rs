//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::policy::{AdminRoleMatrix, ReservedModulePolicy};
use crate::repository::{
    module_catalog::ModuleCatalogRepositoryImpl, role_assignment::RoleAssignmentRepositoryImpl,
    subscription::SubscriptionRepositoryImpl, unit_hierarchy::UnitHierarchyRepositoryImpl,
    unit_role::UnitRoleRepositoryImpl,
};
use crate::service::{
    AccessDecisionPoint, BasicPermissionResolver, EffectiveUnitResolver, UnitPermissionResolver,
    UnitRoleService,
};
use crate::session::SessionStoreImpl;
use crate::state::HasAccessControl;
use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub access_decision: Arc<
        AccessDecisionPoint<
            RoleAssignmentRepositoryImpl,
            SubscriptionRepositoryImpl,
            ModuleCatalogRepositoryImpl,
            UnitHierarchyRepositoryImpl,
            UnitRoleRepositoryImpl,
        >,
    >,
    pub unit_role_service:
        Arc<UnitRoleService<UnitHierarchyRepositoryImpl, UnitRoleRepositoryImpl>>,
    pub session_store: Arc<SessionStoreImpl>,
}

impl AppState {
    pub fn new(config: Config, db_pool: MySqlPool) -> Self {
        let roles = Arc::new(RoleAssignmentRepositoryImpl::new(db_pool.clone()));
        let subscriptions = Arc::new(SubscriptionRepositoryImpl::new(db_pool.clone()));
        let modules = Arc::new(ModuleCatalogRepositoryImpl::new(db_pool.clone()));
        let hierarchy = Arc::new(UnitHierarchyRepositoryImpl::new(db_pool.clone()));
        let unit_roles = Arc::new(UnitRoleRepositoryImpl::new(db_pool.clone()));

        let basic = Arc::new(BasicPermissionResolver::new(
            roles.clone(),
            subscriptions,
            modules,
            ReservedModulePolicy::new(config.access_policy.reserved_grants.clone()),
        ));
        let effective = Arc::new(EffectiveUnitResolver::new(roles.clone(), hierarchy.clone()));
        let units = Arc::new(UnitPermissionResolver::new(
            basic.clone(),
            effective,
            roles,
            hierarchy.clone(),
            unit_roles.clone(),
            AdminRoleMatrix::new(config.access_policy.admin_roles.clone()),
        ));

        Self {
            config: Arc::new(config),
            db_pool: db_pool.clone(),
            access_decision: Arc::new(AccessDecisionPoint::new(basic, units)),
            unit_role_service: Arc::new(UnitRoleService::new(hierarchy, unit_roles)),
            session_store: Arc::new(SessionStoreImpl::new(db_pool)),
        }
    }
}

impl HasAccessControl for AppState {
    type Roles = RoleAssignmentRepositoryImpl;
    type Subscriptions = SubscriptionRepositoryImpl;
    type Modules = ModuleCatalogRepositoryImpl;
    type Units = UnitHierarchyRepositoryImpl;
    type UnitRoles = UnitRoleRepositoryImpl;
    type Sessions = SessionStoreImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn access_decision(
        &self,
    ) -> &AccessDecisionPoint<
        Self::Roles,
        Self::Subscriptions,
        Self::Modules,
        Self::Units,
        Self::UnitRoles,
    > {
        &self.access_decision
    }

    fn unit_role_service(&self) -> &UnitRoleService<Self::Units, Self::UnitRoles> {
        &self.unit_role_service
    }

    fn session_store(&self) -> &Self::Sessions {
        &self.session_store
    }

    async fn check_ready(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok()
    }
}

/// Build the HTTP router with a generic state type, so the same routing
/// works for the production `AppState` and test states.
pub fn build_router<S: HasAccessControl>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Basic (company-only) surface
    let basic_routes = Router::new()
        .route("/api/v1/me/modules", get(api::access::list_my_modules::<S>))
        .route(
            "/api/v1/me/permissions/{module_id}",
            get(api::access::probe_permission::<S>),
        )
        .route(
            "/api/v1/policy/reserved-modules",
            get(api::access::list_reserved_grants::<S>),
        );

    // Unit-aware surface: resolves the unit context once per request
    let unit_routes = Router::new()
        .route("/api/v1/me/unit-context", get(api::access::get_unit_context))
        .route("/api/v1/me/units", get(api::access::list_my_units::<S>))
        .route(
            "/api/v1/unit-roles/{binding_id}/permissions",
            put(api::access::upsert_unit_role_permissions::<S>),
        )
        .route(
            "/api/v1/units/{unit_id}/permissions/copy",
            post(api::access::copy_unit_permissions::<S>),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::unit_context::with_unit_context::<S>,
        ));

    let protected = basic_routes.merge(unit_routes).layer(
        axum::middleware::from_fn_with_state(state.clone(), middleware::auth::require_auth::<S>),
    );

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Connect to the database and serve the API
pub async fn run(config: Config) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let addr = config.http_addr();
    let state = AppState::new(config, db_pool);
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
