//! Backend-side verification of the gateway service credential.
//!
//! Every backend mounts this in front of its internal routes. Requests that
//! fail verification are answered 401 with the [`TRUST_REJECTED_HEADER`]
//! marker so the gateway's proxy can classify the failure as its own
//! misconfiguration rather than an ordinary backend error.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;

use crate::trust::{
    ACTING_USER_HEADER, CREDENTIAL_HEADER, DEFAULT_MAX_AGE_SECS, ForwardedPrincipal,
    ORGANIZATION_HEADER, ROLE_HEADER, TRUST_REJECTED_HEADER, verify_credential,
};

/// State the trust middleware runs with.
#[derive(Clone)]
pub struct TrustVerifier {
    secret: Secret<String>,
    max_age_secs: i64,
}

impl TrustVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self {
            secret,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }
}

pub async fn trust_auth_middleware(
    State(verifier): State<TrustVerifier>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers();

    let principal = match forwarded_principal(headers) {
        Some(p) => p,
        None => return rejected("Missing gateway identity headers"),
    };

    let credential = match headers.get(CREDENTIAL_HEADER).and_then(|v| v.to_str().ok()) {
        Some(c) => c,
        None => return rejected("Missing gateway credential"),
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(err) = verify_credential(
        verifier.secret.expose_secret(),
        credential,
        &principal,
        now,
        verifier.max_age_secs,
    ) {
        tracing::warn!(error = %err, user_id = %principal.user_id, "Gateway credential rejected");
        return rejected("Gateway credential rejected");
    }

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn forwarded_principal(headers: &HeaderMap) -> Option<ForwardedPrincipal> {
    let get = |key: &str| {
        headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Some(ForwardedPrincipal {
        user_id: get(ACTING_USER_HEADER)?,
        organization_id: get(ORGANIZATION_HEADER)?,
        role: get(ROLE_HEADER)?,
    })
}

fn rejected(message: &str) -> Response {
    let mut response =
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response();
    response.headers_mut().insert(
        TRUST_REJECTED_HEADER,
        axum::http::HeaderValue::from_static("true"),
    );
    response
}

/// Extractor for the verified acting principal in backend handlers.
pub struct TrustedCaller(pub ForwardedPrincipal);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for TrustedCaller
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ForwardedPrincipal>()
            .cloned()
            .map(TrustedCaller)
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
