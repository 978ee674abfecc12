//! Access resolution API handlers
//!
//! Two families: the basic (company-only) listing/probe endpoints, and the
//! unit-aware endpoints that run behind the unit-context middleware. The
//! two write endpoints are the only mutations in this service.

use crate::api::{MessageResponse, PaginatedResponse, SuccessResponse};
use crate::domain::{
    CopyUnitPermissionsInput, ModuleFilter, PermissionKind, UpsertUnitPermissionsInput,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::middleware::unit_context::UnitContextExt;
use crate::state::HasAccessControl;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

fn default_kind() -> String {
    "read".to_string()
}

// ==================== Basic (company-only) surface ====================

#[derive(Debug, Deserialize)]
pub struct ModuleListQuery {
    /// Permission bit the listing filters on
    #[serde(default = "default_kind")]
    pub kind: String,
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(
        default = "crate::api::default_page",
        deserialize_with = "crate::api::deserialize_page"
    )]
    pub page: i64,
    #[serde(
        default = "crate::api::default_per_page",
        deserialize_with = "crate::api::deserialize_per_page"
    )]
    pub per_page: i64,
}

/// List the modules the caller can reach, filtered and paginated
pub async fn list_my_modules<S: HasAccessControl>(
    State(state): State<S>,
    auth: AuthUser,
    Query(query): Query<ModuleListQuery>,
) -> Result<impl IntoResponse> {
    let kind: PermissionKind = query.kind.parse()?;
    let filter = ModuleFilter {
        category: query.category,
        search: query.search,
        include_inactive: query.include_inactive,
    };

    let page = state
        .access_decision()
        .get_filtered_modules(auth.user_id, kind, &filter, query.page, query.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        page.items,
        page.page,
        page.per_page,
        page.total,
    )))
}

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    pub kind: String,
    pub unit_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub module_id: i64,
    pub kind: PermissionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    pub allowed: bool,
}

/// Answer "would this call be allowed" for one module and bit. With a
/// `unit_id` the unit-aware surface decides; otherwise the company-scope
/// one does. An unknown kind string is a 400, never a silent deny.
pub async fn probe_permission<S: HasAccessControl>(
    State(state): State<S>,
    auth: AuthUser,
    Path(module_id): Path<i64>,
    Query(query): Query<ProbeQuery>,
) -> Result<impl IntoResponse> {
    let kind: PermissionKind = query.kind.parse()?;

    let allowed = match query.unit_id {
        Some(_) => {
            state
                .access_decision()
                .has_unit_permission(auth.user_id, module_id, kind, query.unit_id)
                .await?
        }
        None => {
            state
                .access_decision()
                .has_permission(auth.user_id, module_id, kind)
                .await?
        }
    };

    Ok(Json(ProbeResponse {
        module_id,
        kind,
        unit_id: query.unit_id,
        allowed,
    }))
}

/// List the reserved-grant policy table. Super admins only.
pub async fn list_reserved_grants<S: HasAccessControl>(
    State(state): State<S>,
    auth: AuthUser,
) -> Result<impl IntoResponse> {
    if !state.access_decision().is_super_admin(auth.user_id).await? {
        return Err(AppError::Forbidden("Super admin required".to_string()));
    }

    let grants = state.access_decision().reserved_grants().to_vec();
    Ok(Json(SuccessResponse::new(grants)))
}

// ==================== Unit-aware surface ====================

/// The caller's resolved unit context, as attached by the middleware
pub async fn get_unit_context(context: UnitContextExt) -> Result<impl IntoResponse> {
    Ok(Json(SuccessResponse::new((*context.0).clone())))
}

/// Units the caller can reach: whole company for company admins, whole
/// primary branch for branch admins, the effective-unit closure otherwise
pub async fn list_my_units<S: HasAccessControl>(
    State(state): State<S>,
    auth: AuthUser,
) -> Result<impl IntoResponse> {
    let units = state
        .access_decision()
        .get_accessible_units(auth.user_id)
        .await?;
    Ok(Json(SuccessResponse::new(units)))
}

/// Replace a unit-role binding's permission rows
pub async fn upsert_unit_role_permissions<S: HasAccessControl>(
    State(state): State<S>,
    context: UnitContextExt,
    Path(binding_id): Path<i64>,
    Json(input): Json<UpsertUnitPermissionsInput>,
) -> Result<impl IntoResponse> {
    if !context.0.admin_levels.is_unit_admin {
        return Err(AppError::Forbidden("Unit admin required".to_string()));
    }

    state
        .unit_role_service()
        .upsert_permissions(binding_id, input)
        .await?;

    Ok(Json(MessageResponse::new("Permissions replaced")))
}

#[derive(Debug, Serialize)]
pub struct CopyResponse {
    pub written: u64,
}

/// Copy a role's permission rows from a source unit onto this unit
pub async fn copy_unit_permissions<S: HasAccessControl>(
    State(state): State<S>,
    context: UnitContextExt,
    Path(target_unit_id): Path<i64>,
    Json(input): Json<CopyUnitPermissionsInput>,
) -> Result<impl IntoResponse> {
    if !context.0.admin_levels.is_unit_admin {
        return Err(AppError::Forbidden("Unit admin required".to_string()));
    }

    let user_id = context.0.user_id;
    if !state
        .access_decision()
        .can_access_unit(user_id, target_unit_id)
        .await?
    {
        return Err(AppError::Forbidden(format!(
            "No access to unit {}",
            target_unit_id
        )));
    }

    let written = state
        .unit_role_service()
        .copy_permissions(target_unit_id, input)
        .await?;

    Ok(Json(SuccessResponse::new(CopyResponse { written })))
}
