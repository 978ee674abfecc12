//! Authentication middleware and extractor
//!
//! The session layer upstream already turned a login into an opaque token;
//! this side validates the presented token against the session store and
//! hands a bare user ID to everything downstream.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::session::SessionStore;
use crate::state::HasAccessControl;

/// Authenticated user attached to the request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Authentication errors
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Token unknown or expired
    InvalidToken,
    /// Session store unreachable
    StoreFailure,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidHeader(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid authorization header")
            }
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::StoreFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session validation failed",
            ),
        };

        let body = json!({
            "error": message,
            "code": if status == StatusCode::UNAUTHORIZED { "UNAUTHORIZED" } else { "INTERNAL" }
        });

        (status, Json(body)).into_response()
    }
}

/// Extract and validate Bearer token from Authorization header
fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::InvalidHeader("Authorization header must use Bearer scheme".to_string())
    })
}

async fn validate_request<S: HasAccessControl>(
    headers: &axum::http::HeaderMap,
    state: &S,
) -> Result<AuthUser, AuthError> {
    let token = extract_bearer_token(headers)?;

    let identity = state
        .session_store()
        .validate_token(token)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "session store lookup failed");
            AuthError::StoreFailure
        })?
        .ok_or(AuthError::InvalidToken)?;

    Ok(AuthUser {
        user_id: identity.user_id,
    })
}

/// Authentication enforcement middleware.
///
/// Validates the bearer token once per request and attaches the resulting
/// `AuthUser` to the request extensions. Requests without a valid token are
/// rejected with 401.
pub async fn require_auth<S: HasAccessControl>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match validate_request(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Axum extractor for authenticated users.
///
/// Picks up the identity `require_auth` attached; outside that layer it
/// validates the token itself, so handlers stay usable in isolation.
impl<S> FromRequestParts<S> for AuthUser
where
    S: HasAccessControl,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        validate_request(&parts.headers, state).await
    }
}
