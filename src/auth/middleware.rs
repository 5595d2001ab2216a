//! Authentication middleware and extractors

use crate::api::SharedState;
use crate::auth::models::{User, UserRole};
use crate::error::{Error, Result};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

pub const UNAUTHENTICATED: &str = "Please authenticate.";
pub const ACCESS_DENIED: &str = "Access denied";

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| Error::Unauthorized(UNAUTHENTICATED.to_string()))
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the bearer token, load its user and attach it to the request.
/// Any failure ends the request with 401.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let Some(token) = extract_bearer_token(req.headers()) else {
        tracing::debug!("Rejected {}: no bearer token", req.uri().path());
        return Err(Error::Unauthorized(UNAUTHENTICATED.to_string()));
    };

    let user_id = state.tokens.verify(token).inspect_err(|e| {
        tracing::debug!("Rejected {}: {}", req.uri().path(), e);
    })?;

    let Some(record) = state.store.get_user(user_id).await? else {
        tracing::debug!("Rejected {}: user {} no longer exists", req.uri().path(), user_id);
        return Err(Error::Unauthorized(UNAUTHENTICATED.to_string()));
    };

    req.extensions_mut().insert(AuthUser(record.user));
    Ok(next.run(req).await)
}

/// Let the request through only if the authenticated user's role is allowed
pub async fn role_guard(allowed: &'static [UserRole], req: Request, next: Next) -> Result<Response> {
    let Some(AuthUser(user)) = req.extensions().get::<AuthUser>() else {
        return Err(Error::Unauthorized(UNAUTHENTICATED.to_string()));
    };

    if !user.role.is_allowed(allowed) {
        tracing::debug!(
            "Denied {} to user {} with role {}",
            req.uri().path(),
            user.id,
            user.role
        );
        return Err(Error::Forbidden(ACCESS_DENIED.to_string()));
    }

    Ok(next.run(req).await)
}
