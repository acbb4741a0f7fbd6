//! Cross-service workflow test harness.
//!
//! Spins the gateway and mock backends in-process on ephemeral ports, so the
//! cross-service properties (retry, health aggregation, dashboard merge,
//! tenant isolation) run without any external services. The Labs mock links
//! the real `collab-engine` and mounts the real trust middleware, so the
//! gateway's outbound credential is verified end to end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use collab_engine::{
    CollaborationLedger, CollaborationScope, Lab, Researcher, collaboration_email, score_pair,
    suggestions,
};
use orchestrator_service::config::{
    BackendUrls, OrchestratorConfig, ProxyConfig, SecurityConfig, TokenConfig, TrustConfig,
};
use orchestrator_service::directory::InMemoryDirectory;
use orchestrator_service::{AppState, build_router};
use secrecy::Secret;
use serde::Deserialize;
use serde_json::{Value, json};
use service_core::config::{Config, Environment};
use service_core::middleware::trust::{TrustVerifier, TrustedCaller, trust_auth_middleware};

/// Shared gateway-to-backend secret for every in-process backend.
pub const TRUST_SECRET: &str = "workflow-trust-secret";
pub const TOKEN_SECRET: &str = "workflow-token-secret";
pub const PASSWORD: &str = "workflow-password-123";

/// Outbound proxy timeout used by the test gateway. Flaky backends sleep well
/// past this to force a timeout.
pub const PROXY_TIMEOUT: Duration = Duration::from_millis(300);
pub const BACKEND_STALL: Duration = Duration::from_secs(2);

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A mock backend serving on an ephemeral local port.
pub struct MockBackend {
    pub addr: SocketAddr,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_backend(router: Router) -> MockBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    MockBackend { addr }
}

/// Reserve a port for a backend whose router needs data only known later
/// (the org id a user gets at registration). The gateway can be pointed at
/// the URL before the router is served.
pub async fn reserve_backend() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("reserve mock backend");
    let url = format!("http://{}", listener.local_addr().expect("mock backend addr"));
    (listener, url)
}

pub fn serve_backend(listener: tokio::net::TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
}

/// A base URL nothing listens on; connections are refused immediately.
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1".to_string()
}

async fn healthy() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Backend that answers every data path with a fixed body and reports healthy.
pub fn data_backend(body: Value) -> Router {
    Router::new()
        .route("/health", get(healthy))
        .fallback(move || {
            let body = body.clone();
            async move { Json(body) }
        })
}

/// Backend whose data paths work but whose health probe answers `status`.
pub fn degraded_backend(status: u16) -> Router {
    Router::new()
        .route(
            "/health",
            get(move || async move {
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (code, Json(json!({ "status": "unhealthy" })))
            }),
        )
        .fallback(|| async { Json(json!({})) })
}

/// Backend that stalls past the proxy timeout for the first `fail_first`
/// data requests, then answers normally. The counter exposes how many
/// requests actually arrived, so tests can assert retry behavior.
pub fn flaky_backend(fail_first: u32, body: Value) -> (Router, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let seen = hits.clone();
    let router = Router::new()
        .route("/health", get(healthy))
        .fallback(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            async move {
                if n < fail_first {
                    tokio::time::sleep(BACKEND_STALL).await;
                }
                Json(body)
            }
        });
    (router, hits)
}

/// Backend configured with the wrong trust secret: the real verification
/// middleware rejects every gateway call with the rejection marker. The
/// counter sits outside the trust layer, so rejected attempts still count.
pub fn misconfigured_trust_backend() -> (Router, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let verifier = TrustVerifier::new(Secret::new("not-the-gateway-secret".to_string()));
    let router = Router::new()
        .fallback(|| async { Json(json!({})) })
        .layer(from_fn_with_state(verifier, trust_auth_middleware))
        .layer(from_fn_with_state(hits.clone(), count_requests))
        .route("/health", get(healthy));
    (router, hits)
}

async fn count_requests(
    State(hits): State<Arc<AtomicU32>>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Labs backend: real collab-engine behind the real trust middleware.

#[derive(Clone)]
pub struct LabsState {
    labs: Arc<Vec<Lab>>,
    researchers: Arc<Vec<Researcher>>,
    ledger: Arc<CollaborationLedger>,
}

#[derive(Deserialize)]
struct ScopeQuery {
    scope: Option<String>,
}

pub fn labs_backend(labs: Vec<Lab>, researchers: Vec<Researcher>) -> Router {
    let state = LabsState {
        labs: Arc::new(labs),
        researchers: Arc::new(researchers),
        ledger: Arc::new(CollaborationLedger::new()),
    };
    let verifier = TrustVerifier::new(Secret::new(TRUST_SECRET.to_string()));

    Router::new()
        .route(
            "/api/v1/collaboration/suggestions",
            get(labs_suggestions),
        )
        .route(
            "/api/v1/collaboration/accept/:lab_a/:lab_b",
            post(labs_accept),
        )
        .route(
            "/api/v1/collaboration/email/:lab_a/:lab_b",
            post(labs_email),
        )
        .route("/api/v1/labs", get(labs_list))
        .with_state(state)
        .layer(from_fn_with_state(verifier, trust_auth_middleware))
        .route("/health", get(healthy))
}

fn parse_scope(query: &ScopeQuery) -> CollaborationScope {
    match query.scope.as_deref() {
        Some("across_organizations") => CollaborationScope::AcrossOrganizations,
        _ => CollaborationScope::WithinOrganization,
    }
}

async fn labs_suggestions(
    State(state): State<LabsState>,
    TrustedCaller(caller): TrustedCaller,
    Query(query): Query<ScopeQuery>,
) -> Json<Value> {
    let scope = parse_scope(&query);
    let visible: Vec<Lab> = match scope {
        CollaborationScope::WithinOrganization => state
            .labs
            .iter()
            .filter(|lab| lab.organization_id == caller.organization_id)
            .cloned()
            .collect(),
        CollaborationScope::AcrossOrganizations => state.labs.to_vec(),
    };

    let got = suggestions(&visible, &state.researchers, scope, &state.ledger);
    Json(json!({ "suggestions": got }))
}

async fn labs_accept(
    State(state): State<LabsState>,
    TrustedCaller(caller): TrustedCaller,
    Path((lab_a, lab_b)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    for id in [&lab_a, &lab_b] {
        let lab = state
            .labs
            .iter()
            .find(|l| &l.id == id)
            .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "Lab not found" }))))?;
        if lab.organization_id != caller.organization_id {
            return Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Lab belongs to another organization" })),
            ));
        }
    }

    let newly_accepted = state.ledger.accept(&lab_a, &lab_b);
    Ok(Json(json!({
        "status": "accepted",
        "newly_accepted": newly_accepted,
    })))
}

async fn labs_email(
    State(state): State<LabsState>,
    TrustedCaller(_caller): TrustedCaller,
    Path((lab_a, lab_b)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let find = |id: &str| {
        state
            .labs
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "Lab not found" }))))
    };
    let a = find(&lab_a)?;
    let b = find(&lab_b)?;

    let breakdown = score_pair(&a, &b, &state.researchers);
    let email = collaboration_email(&a, &b, &breakdown);
    Ok(Json(json!({ "subject": email.subject, "body": email.body })))
}

async fn labs_list(
    State(state): State<LabsState>,
    TrustedCaller(caller): TrustedCaller,
) -> Json<Value> {
    let own: Vec<&Lab> = state
        .labs
        .iter()
        .filter(|lab| lab.organization_id == caller.organization_id)
        .collect();
    Json(json!({ "labs": own }))
}

// ---------------------------------------------------------------------------
// Gateway harness.

/// Backend URLs the test gateway points at; defaults to ports nothing
/// listens on.
pub struct GatewayBackends {
    pub projects: String,
    pub activity: String,
    pub performance: String,
    pub labs: String,
}

impl Default for GatewayBackends {
    fn default() -> Self {
        Self {
            projects: unreachable_url(),
            activity: unreachable_url(),
            performance: unreachable_url(),
            labs: unreachable_url(),
        }
    }
}

pub fn test_config(backends: GatewayBackends, scope: CollaborationScope) -> OrchestratorConfig {
    OrchestratorConfig {
        common: Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "orchestrator-service".to_string(),
        service_version: "test".to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        token: TokenConfig {
            secret: Secret::new(TOKEN_SECRET.to_string()),
            expiry_days: 7,
        },
        trust: TrustConfig {
            secret: Secret::new(TRUST_SECRET.to_string()),
            max_age_secs: 60,
        },
        backends: BackendUrls {
            projects: backends.projects,
            activity: backends.activity,
            performance: backends.performance,
            labs: backends.labs,
        },
        proxy: ProxyConfig {
            timeout: PROXY_TIMEOUT,
            health_timeout: Duration::from_millis(200),
            max_retries: 2,
            retry_backoff: Duration::from_millis(10),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        collaboration_scope: scope,
    }
}

/// An in-process gateway listening on an ephemeral port.
pub struct TestGateway {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub async fn spawn(backends: GatewayBackends, scope: CollaborationScope) -> Self {
        init_tracing();

        let config = test_config(backends, scope);
        let directory = Arc::new(InMemoryDirectory::new());
        let state = AppState::new(&config, directory).expect("gateway state");
        let app = build_router(state, &config).expect("gateway router");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind gateway");
        let addr = listener.local_addr().expect("gateway addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user; returns the full response body (token, user,
    /// organization).
    pub async fn register(&self, email: &str, name: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "name": name, "password": PASSWORD }))
            .send()
            .await
            .expect("register request");
        assert_eq!(response.status().as_u16(), 201, "register should succeed");
        response.json().await.expect("register body")
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status().as_u16(), 200, "login should succeed");
        let body: Value = response.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("gateway GET")
    }

    pub async fn post(&self, path: &str, token: &str, body: Option<Value>) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("gateway POST")
    }
}

// ---------------------------------------------------------------------------
// Fixture builders.

pub fn lab(id: &str, org: &str, name: &str, focus: &str) -> Lab {
    Lab {
        id: id.to_string(),
        organization_id: org.to_string(),
        name: name.to_string(),
        focus_area: focus.to_string(),
        description: String::new(),
    }
}

pub fn researcher(id: &str, lab_id: &str, expertise: &[&str]) -> Researcher {
    Researcher {
        id: id.to_string(),
        lab_id: lab_id.to_string(),
        name: format!("Researcher {}", id),
        expertise: expertise.iter().map(|t| t.to_string()).collect(),
    }
}
