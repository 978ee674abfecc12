//! Module-permission enforcement middleware (basic surface)
//!
//! Route families that map onto one module are wrapped with this guard:
//! it checks a single permission bit against the company-scope resolution
//! and rejects with 403 on denial. Unit-aware families use
//! `unit_context::with_unit_context` instead.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::domain::PermissionKind;
use crate::error::AppError;
use crate::middleware::auth::{AuthError, AuthUser};
use crate::state::HasAccessControl;

/// State bundle for the guard: the app state plus the module/bit the
/// wrapped route family requires
#[derive(Clone)]
pub struct ModuleGuard<S> {
    pub state: S,
    pub module_id: i64,
    pub kind: PermissionKind,
}

impl<S> ModuleGuard<S> {
    pub fn new(state: S, module_id: i64, kind: PermissionKind) -> Self {
        Self {
            state,
            module_id,
            kind,
        }
    }
}

/// Deny unless the authenticated user holds the required bit on the
/// required module. Absence of a grant is a plain 403; resolution failures
/// surface as 500.
pub async fn require_module_permission<S: HasAccessControl>(
    State(guard): State<ModuleGuard<S>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>().cloned() else {
        return AuthError::MissingToken.into_response();
    };

    match guard
        .state
        .access_decision()
        .has_permission(user.user_id, guard.module_id, guard.kind)
        .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => AppError::Forbidden(format!(
            "Missing {} permission on module {}",
            guard.kind, guard.module_id
        ))
        .into_response(),
        Err(err) => err.into_response(),
    }
}
