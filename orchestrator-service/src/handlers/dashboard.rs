use axum::{Json, extract::State};
use service_core::error::AppError;

use crate::aggregators::{self, DashboardView};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    AuthContext(context): AuthContext,
) -> Result<Json<DashboardView>, AppError> {
    let view = aggregators::dashboard(&state.proxy, &context).await?;
    Ok(Json(view))
}
