use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::aggregators::{self, AggregateHealthReport};
use crate::state::AppState;

/// Gateway liveness only; no downstream probes.
pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Per-backend health map. Always answers 200 while the gateway itself is up.
pub async fn aggregate(State(state): State<AppState>) -> Json<AggregateHealthReport> {
    Json(aggregators::health(&state.proxy).await)
}
