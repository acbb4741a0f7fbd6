pub mod aggregators;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

use crate::config::OrchestratorConfig;

pub fn build_router(state: AppState, config: &OrchestratorConfig) -> Result<Router, AppError> {
    let authenticated = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/invitations",
            post(handlers::invitations::create).get(handlers::invitations::list_own),
        )
        .route(
            "/invitations/:id/accept",
            post(handlers::invitations::accept),
        )
        .route(
            "/invitations/:id/reject",
            post(handlers::invitations::reject),
        )
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route(
            "/collaboration/suggestions",
            get(handlers::collaboration::suggestions),
        )
        .route(
            "/collaboration/accept/:lab_a/:lab_b",
            post(handlers::collaboration::accept),
        )
        .route(
            "/collaboration/email/:lab_a/:lab_b",
            post(handlers::collaboration::email),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/health", get(handlers::health::aggregate))
        .merge(authenticated);

    let app = Router::new()
        .route("/health", get(handlers::health::liveness))
        .nest("/api/v1", api)
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn cors_layer(config: &OrchestratorConfig) -> Result<CorsLayer, AppError> {
    let origins = config
        .security
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                AppError::Config(anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]))
}
