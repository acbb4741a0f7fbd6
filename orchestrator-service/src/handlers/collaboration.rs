//! Collaboration routes, proxied to the Labs backend.
//!
//! The gateway contributes the tenant scope: identity headers pin the caller's
//! organization and the configured collaboration scope rides along as a query
//! parameter, so the Labs service never widens a within-org deployment.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use collab_engine::CollaborationScope;
use reqwest::Method;
use serde_json::Value;
use service_core::error::AppError;

use crate::middleware::auth::AuthContext;
use crate::services::Backend;
use crate::state::AppState;

pub async fn suggestions(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let path = format!(
        "/api/v1/collaboration/suggestions?scope={}",
        scope_param(state.collaboration_scope)
    );
    forward(&state, Method::GET, &path, &context).await
}

pub async fn accept(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
    Path((lab_a, lab_b)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let path = format!("/api/v1/collaboration/accept/{}/{}", lab_a, lab_b);
    forward(&state, Method::POST, &path, &context).await
}

pub async fn email(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
    Path((lab_a, lab_b)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let path = format!("/api/v1/collaboration/email/{}/{}", lab_a, lab_b);
    forward(&state, Method::POST, &path, &context).await
}

async fn forward(
    state: &AppState,
    method: Method,
    path: &str,
    context: &crate::directory::OrganizationContext,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let response = state
        .proxy
        .call(method, Backend::Labs, path, context, None)
        .await?;
    let status = StatusCode::from_u16(response.status)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Backend status: {}", e)))?;
    Ok((status, Json(response.body)))
}

fn scope_param(scope: CollaborationScope) -> &'static str {
    match scope {
        CollaborationScope::WithinOrganization => "within_organization",
        CollaborationScope::AcrossOrganizations => "across_organizations",
    }
}
