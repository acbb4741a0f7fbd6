//! Outbound calls from the gateway to the downstream backends.
//!
//! Every data call carries the service-trust credential plus the acting
//! principal's identity headers. Transient failures (timeout, connection
//! refused) are retried for idempotent methods only; application errors from
//! the backend pass through untouched.

use chrono::Utc;
use reqwest::{
    Client, Method, StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use service_core::error::{AppError, ProxyError};
use service_core::trust::{
    self, ACTING_USER_HEADER, CREDENTIAL_HEADER, ORGANIZATION_HEADER, ROLE_HEADER,
    TRUST_REJECTED_HEADER,
};
use tracing::{debug, warn};

use crate::config::{BackendUrls, ProxyConfig};
use crate::directory::OrganizationContext;

/// The four downstream services the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Projects,
    Activity,
    Performance,
    Labs,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Projects => "projects",
            Backend::Activity => "activity",
            Backend::Performance => "performance",
            Backend::Labs => "labs",
        }
    }

    pub fn all() -> [Backend; 4] {
        [
            Backend::Projects,
            Backend::Activity,
            Backend::Performance,
            Backend::Labs,
        ]
    }
}

/// A usable answer from a backend: a 2xx status and its JSON body.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
}

pub struct ServiceProxy {
    client: Client,
    backends: BackendUrls,
    trust_secret: Secret<String>,
    config: ProxyConfig,
}

impl ServiceProxy {
    pub fn new(
        backends: BackendUrls,
        trust_secret: Secret<String>,
        config: ProxyConfig,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init: {}", e)))?;

        Ok(Self {
            client,
            backends,
            trust_secret,
            config,
        })
    }

    fn base_url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Projects => &self.backends.projects,
            Backend::Activity => &self.backends.activity,
            Backend::Performance => &self.backends.performance,
            Backend::Labs => &self.backends.labs,
        }
    }

    /// Call a backend on behalf of a principal.
    ///
    /// GET and HEAD calls are retried on transient failure up to the
    /// configured attempt count; mutating methods get a single attempt so a
    /// write is never applied twice.
    pub async fn call(
        &self,
        method: Method,
        backend: Backend,
        path: &str,
        context: &OrganizationContext,
        body: Option<&Value>,
    ) -> Result<ProxyResponse, AppError> {
        let headers = self.identity_headers(context)?;
        let url = format!("{}{}", self.base_url(backend), path);
        let idempotent = matches!(method, Method::GET | Method::HEAD);
        let retries = if idempotent { self.config.max_retries } else { 0 };

        let mut attempt = 0;
        loop {
            let result = self
                .attempt(method.clone(), backend, &url, headers.clone(), body)
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < retries => {
                    attempt += 1;
                    warn!(
                        backend = backend.name(),
                        attempt,
                        error = %err,
                        "Retrying transient backend failure"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Probe a backend's health endpoint. Single attempt, shorter timeout, no
    /// principal attached.
    pub async fn probe(&self, backend: Backend) -> Result<u16, ProxyError> {
        let url = format!("{}/health", self.base_url(backend));
        let response = self
            .client
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| classify(backend, e))?;

        Ok(response.status().as_u16())
    }

    async fn attempt(
        &self,
        method: Method,
        backend: Backend,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<ProxyResponse, ProxyError> {
        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(self.config.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| classify(backend, e))?;
        let status = response.status();

        if trust_was_rejected(&status, response.headers()) {
            return Err(ProxyError::TrustRejected(backend.name().to_string()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify(backend, e))?;
        let body = parse_body(&text);

        if status.is_success() {
            debug!(backend = backend.name(), status = status.as_u16(), "Backend call ok");
            Ok(ProxyResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ProxyError::BackendError {
                service: backend.name().to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }

    fn identity_headers(&self, context: &OrganizationContext) -> Result<HeaderMap, AppError> {
        let credential = trust::mint_credential(
            self.trust_secret.expose_secret(),
            &context.user_id,
            &context.organization_id,
            context.role.as_str(),
            Utc::now().timestamp(),
        )
        .map_err(AppError::Internal)?;

        let mut headers = HeaderMap::new();
        for (name, value) in [
            (CREDENTIAL_HEADER, credential.as_str()),
            (ACTING_USER_HEADER, context.user_id.as_str()),
            (ORGANIZATION_HEADER, context.organization_id.as_str()),
            (ROLE_HEADER, context.role.as_str()),
        ] {
            let name = HeaderName::from_static(name);
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// A backend 401/403 carrying the rejection marker means our own credential
/// was refused, which is never retried and never passed through.
fn trust_was_rejected(status: &StatusCode, headers: &HeaderMap) -> bool {
    if *status != StatusCode::UNAUTHORIZED && *status != StatusCode::FORBIDDEN {
        return false;
    }
    headers
        .get(TRUST_REJECTED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "true")
        .unwrap_or(false)
}

fn classify(backend: Backend, err: reqwest::Error) -> ProxyError {
    let name = backend.name().to_string();
    if err.is_timeout() {
        ProxyError::Timeout(name)
    } else {
        ProxyError::Unreachable(name, err.to_string())
    }
}

fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_stable() {
        let names: Vec<&str> = Backend::all().iter().map(|b| b.name()).collect();
        assert_eq!(names, ["projects", "activity", "performance", "labs"]);
    }

    #[test]
    fn rejection_marker_requires_auth_status() {
        let mut headers = HeaderMap::new();
        headers.insert(TRUST_REJECTED_HEADER, HeaderValue::from_static("true"));

        assert!(trust_was_rejected(&StatusCode::UNAUTHORIZED, &headers));
        assert!(trust_was_rejected(&StatusCode::FORBIDDEN, &headers));
        assert!(!trust_was_rejected(&StatusCode::BAD_REQUEST, &headers));
        assert!(!trust_was_rejected(&StatusCode::UNAUTHORIZED, &HeaderMap::new()));
    }

    #[test]
    fn non_json_bodies_become_strings() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(parse_body("plain text"), Value::String("plain text".into()));
    }
}
