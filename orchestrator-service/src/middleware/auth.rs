//! Bearer-token authentication for the versioned API surface.
//!
//! Validates the token, then resolves the caller's current membership in the
//! token's organization. Both the raw principal and the resolved context land
//! in request extensions; handlers pull the context through [`AuthContext`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::{AppError, AuthError};

use crate::directory::{OrganizationContext, resolve_scope};
use crate::services::Principal;
use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let principal = state.tokens.validate_token(token)?;
    let context = resolve_scope(state.directory.as_ref(), &principal).await?;

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Malformed)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::Malformed.into())
}

/// Extractor for the resolved organization context, available on any route
/// behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthContext(pub OrganizationContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrganizationContext>()
            .cloned()
            .map(AuthContext)
            .ok_or_else(|| AuthError::Malformed.into())
    }
}

/// Extractor for the raw token principal; used where the token's own claims
/// matter (the `me` echo).
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or_else(|| AuthError::Malformed.into())
    }
}
