//! Invitation lifecycle: create (Manager+), list own, accept, reject.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use service_core::error::{AppError, AuthzError};
use tracing::info;
use validator::Validate;

use crate::directory::{Invitation, Membership, Role, authorize};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub role: Role,
}

pub async fn create(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
    Json(payload): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    payload.validate()?;
    authorize(&context, Role::Manager)?;

    let invitation = Invitation::new(
        context.organization_id.clone(),
        payload.email.to_lowercase(),
        payload.role,
        context.user_id.clone(),
    );
    state.directory.insert_invitation(invitation.clone()).await?;

    info!(
        invitation_id = %invitation.id,
        organization_id = %context.organization_id,
        "Invitation created"
    );
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Invitations addressed to the caller's own email, oldest first.
pub async fn list_own(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
) -> Result<Json<Vec<Invitation>>, AppError> {
    let email = caller_email(&state, &context.user_id).await?;
    let invitations = state.directory.invitations_for_email(&email).await?;
    Ok(Json(invitations))
}

/// Accepting joins the organization and makes it the caller's active one, so
/// the next login is scoped to it with the invited role.
pub async fn accept(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, AppError> {
    let mut invitation = load_addressed(&state, &context.user_id, &id).await?;

    invitation
        .accept()
        .map_err(|e| AppError::InvalidState(e.to_string()))?;

    state
        .directory
        .upsert_membership(Membership::new(
            context.user_id.clone(),
            invitation.organization_id.clone(),
            invitation.role,
        ))
        .await?;

    if let Some(mut user) = state.directory.user_by_id(&context.user_id).await? {
        user.active_organization_id = Some(invitation.organization_id.clone());
        state.directory.update_user(user).await?;
    }

    state.directory.update_invitation(invitation.clone()).await?;

    info!(
        invitation_id = %invitation.id,
        organization_id = %invitation.organization_id,
        "Invitation accepted"
    );
    Ok(Json(invitation))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, AppError> {
    let mut invitation = load_addressed(&state, &context.user_id, &id).await?;

    invitation
        .reject()
        .map_err(|e| AppError::InvalidState(e.to_string()))?;
    state.directory.update_invitation(invitation.clone()).await?;

    info!(invitation_id = %invitation.id, "Invitation rejected");
    Ok(Json(invitation))
}

/// Load an invitation and check it is addressed to the caller's email. Anyone
/// else gets `Forbidden`, including admins of the inviting organization.
async fn load_addressed(
    state: &AppState,
    user_id: &str,
    invitation_id: &str,
) -> Result<Invitation, AppError> {
    let invitation = state
        .directory
        .invitation(invitation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    let email = caller_email(state, user_id).await?;
    if !invitation.email.eq_ignore_ascii_case(&email) {
        return Err(AuthzError::Forbidden.into());
    }
    Ok(invitation)
}

async fn caller_email(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let user = state
        .directory
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok(user.email)
}
