//! Unit-aware context middleware
//!
//! Resolves the full `UnitContext` snapshot once per request and attaches
//! it to the request extensions, so unit-aware handlers and guards share a
//! single resolution instead of each re-deriving it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::domain::UnitContext;
use crate::middleware::auth::{AuthError, AuthUser};
use crate::state::HasAccessControl;

pub async fn with_unit_context<S: HasAccessControl>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>().cloned() else {
        return AuthError::MissingToken.into_response();
    };

    match state
        .access_decision()
        .get_user_unit_permissions(user.user_id)
        .await
    {
        Ok(context) => {
            request.extensions_mut().insert(Arc::new(context));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Convenience alias for handlers extracting the attached snapshot
pub type UnitContextExt = axum::Extension<Arc<UnitContext>>;
