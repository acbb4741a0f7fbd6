//! Registration, login, and the authenticated identity echo.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use service_core::error::{AppError, AuthzError};
use tracing::info;
use validator::Validate;

use crate::directory::{Membership, Organization, Role, User};
use crate::middleware::auth::{AuthContext, AuthPrincipal};
use crate::state::AppState;
use crate::utils::password::{hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub password: Secret<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
}

/// Create a user. Registration without an invitation implicitly creates a
/// personal organization owned by the user, with an admin membership, and the
/// issued token is scoped to it.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    payload.validate()?;
    check_password_length(&payload.password)?;

    let hash = hash_password(&payload.password).map_err(AppError::Internal)?;
    let mut user = User::new(payload.email.to_lowercase(), payload.name.clone(), hash);

    let organization = Organization::new(format!("{}'s Organization", payload.name), user.id.clone());
    user.active_organization_id = Some(organization.id.clone());

    state.directory.insert_user(user.clone()).await?;
    state
        .directory
        .insert_organization(organization.clone())
        .await?;
    state
        .directory
        .upsert_membership(Membership::new(
            user.id.clone(),
            organization.id.clone(),
            Role::Admin,
        ))
        .await?;

    let token = state
        .tokens
        .issue_token(&user.id, &organization.id, Role::Admin)?;

    info!(user_id = %user.id, organization_id = %organization.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            user,
            organization: Some(organization),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate()?;

    let user = state
        .directory
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let matches = verify_password(&payload.password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !matches {
        return Err(invalid_credentials());
    }

    let organization_id = user
        .active_organization_id
        .clone()
        .ok_or(AuthzError::NoActiveOrganization)?;
    let membership = state
        .directory
        .membership(&user.id, &organization_id)
        .await?
        .ok_or(AuthzError::NoActiveOrganization)?;

    let token = state
        .tokens
        .issue_token(&user.id, &organization_id, membership.role)?;

    info!(user_id = %user.id, organization_id = %organization_id, "User logged in");
    Ok(Json(TokenResponse {
        token,
        user,
        organization: None,
    }))
}

/// Echo of the validated principal plus the resolved membership scope.
pub async fn me(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    AuthContext(context): AuthContext,
) -> Result<Json<Value>, AppError> {
    let user = state
        .directory
        .user_by_id(&principal.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(json!({
        "user": user,
        "organization_id": context.organization_id,
        "role": context.role,
    })))
}

fn check_password_length(password: &Secret<String>) -> Result<(), AppError> {
    use secrecy::ExposeSecret;
    if password.expose_secret().len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

// Same message for unknown email and wrong password.
fn invalid_credentials() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"))
}
