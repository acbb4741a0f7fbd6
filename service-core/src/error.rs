use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Bearer-token validation failures. Stateless checks, never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Now is at or past the token's expiry.
    #[error("Token expired")]
    Expired,

    /// The token's structure or claim shape does not parse.
    #[error("Token malformed")]
    Malformed,

    /// The token parses but was not signed with our key.
    #[error("Token signature invalid")]
    Invalid,
}

/// Tenant-scope and role failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    /// The caller's role is below the required role.
    #[error("Insufficient role for this operation")]
    Forbidden,

    /// The token embeds an organization the caller is no longer a member of.
    #[error("No active organization membership for this token")]
    NoActiveOrganization,
}

/// Outcomes of a gateway-to-backend call that did not produce a usable body.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The backend did not respond within the per-call timeout.
    #[error("Backend '{0}' timed out")]
    Timeout(String),

    /// Connection-level failure before any response.
    #[error("Backend '{0}' unreachable: {1}")]
    Unreachable(String, String),

    /// The backend answered with an application-level error. Passed through
    /// verbatim with its status code.
    #[error("Backend '{service}' returned status {status}")]
    BackendError {
        service: String,
        status: u16,
        body: serde_json::Value,
    },

    /// The backend refused the gateway's own service credential. This is a
    /// configuration fault on our side, not a transient backend issue.
    #[error("Backend '{0}' rejected the gateway service credential")]
    TrustRejected(String),
}

impl ProxyError {
    /// Transient failures are the only ones eligible for retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProxyError::Timeout(_) | ProxyError::Unreachable(..))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    /// Credential failures outside the token taxonomy (bad login password).
    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Every branch of an aggregate call failed; no partial data is returned.
    #[error("All aggregated backends are unavailable")]
    AggregateUnavailable,

    /// A state machine (invitation, collaboration) was driven out of a
    /// terminal state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        // A backend's own error body is forwarded as-is, status included.
        if let AppError::Proxy(ProxyError::BackendError { status, body, .. }) = self {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(body)).into_response();
        }

        let (status, error_message, details) = match self {
            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation error".to_string(),
                Some(err.to_string()),
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), None),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::Auth(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::Authz(err) => (StatusCode::FORBIDDEN, err.to_string(), None),
            AppError::Proxy(ProxyError::Timeout(service)) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("Backend '{}' timed out", service),
                None,
            ),
            AppError::Proxy(ProxyError::Unreachable(service, detail)) => (
                StatusCode::BAD_GATEWAY,
                format!("Backend '{}' unreachable", service),
                Some(detail),
            ),
            AppError::Proxy(ProxyError::TrustRejected(service)) => (
                StatusCode::BAD_GATEWAY,
                format!("Backend '{}' rejected the gateway credential", service),
                None,
            ),
            AppError::Proxy(ProxyError::BackendError { .. }) => unreachable!(),
            AppError::AggregateUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "All aggregated backends are unavailable".to_string(),
                None,
            ),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Conflict(err) => (StatusCode::CONFLICT, err.to_string(), None),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
            ),
            AppError::Config(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}
