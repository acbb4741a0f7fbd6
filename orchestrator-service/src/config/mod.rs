use collab_engine::CollaborationScope;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::config::{Environment, get_env};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Immutable process-wide configuration, built once at startup and passed by
/// reference into every component. No ambient lookups after this point.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub token: TokenConfig,
    pub trust: TrustConfig,
    pub backends: BackendUrls,
    pub proxy: ProxyConfig,
    pub security: SecurityConfig,
    /// Whether lab collaboration suggestions may span organizations.
    pub collaboration_scope: CollaborationScope,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: Secret<String>,
    pub expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// Shared secret between the gateway and every backend.
    pub secret: Secret<String>,
    pub max_age_secs: i64,
}

/// Base URLs of the four downstream backends.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendUrls {
    pub projects: String,
    pub activity: String,
    pub performance: String,
    pub labs: String,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Per-call timeout for data requests.
    pub timeout: Duration,
    /// Shorter timeout for health probes.
    pub health_timeout: Duration,
    /// Retries for idempotent calls on transient failure, on top of the
    /// initial attempt.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let config = OrchestratorConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("orchestrator-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            token: TokenConfig {
                secret: Secret::new(get_env(
                    "TOKEN_SECRET",
                    Some("dev-only-token-secret"),
                    is_prod,
                )?),
                expiry_days: parse_env("TOKEN_EXPIRY_DAYS", "7", is_prod)?,
            },
            trust: TrustConfig {
                secret: Secret::new(get_env(
                    "SERVICE_TRUST_SECRET",
                    Some("dev-only-trust-secret"),
                    is_prod,
                )?),
                max_age_secs: parse_env("SERVICE_TRUST_MAX_AGE_SECS", "60", is_prod)?,
            },
            backends: BackendUrls {
                projects: get_env("PROJECTS_SERVICE_URL", Some("http://localhost:8000"), is_prod)?,
                activity: get_env("ACTIVITY_SERVICE_URL", Some("http://localhost:8001"), is_prod)?,
                performance: get_env(
                    "PERFORMANCE_SERVICE_URL",
                    Some("http://localhost:8003"),
                    is_prod,
                )?,
                labs: get_env("LABS_SERVICE_URL", Some("http://localhost:8004"), is_prod)?,
            },
            proxy: ProxyConfig {
                timeout: Duration::from_millis(parse_env("PROXY_TIMEOUT_MS", "3000", is_prod)?),
                health_timeout: Duration::from_millis(parse_env(
                    "PROXY_HEALTH_TIMEOUT_MS",
                    "2000",
                    is_prod,
                )?),
                max_retries: parse_env("PROXY_MAX_RETRIES", "2", is_prod)?,
                retry_backoff: Duration::from_millis(parse_env(
                    "PROXY_RETRY_BACKOFF_MS",
                    "100",
                    is_prod,
                )?),
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
            collaboration_scope: match get_env("COLLABORATION_SCOPE", Some("within"), is_prod)?
                .to_lowercase()
                .as_str()
            {
                "within" => CollaborationScope::WithinOrganization,
                "across" => CollaborationScope::AcrossOrganizations,
                other => {
                    return Err(AppError::Config(anyhow::anyhow!(
                        "COLLABORATION_SCOPE must be 'within' or 'across', got '{}'",
                        other
                    )));
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.token.expiry_days <= 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.proxy.timeout.is_zero() || self.proxy.health_timeout.is_zero() {
            return Err(AppError::Config(anyhow::anyhow!(
                "Proxy timeouts must be positive"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::Config(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::Config(anyhow::anyhow!("{}: {}", key, e)))
}
