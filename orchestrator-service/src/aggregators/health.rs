//! Aggregate health: one concurrent probe per backend.
//!
//! The gateway answers 200 whenever it is up; a down backend shows up in the
//! report, never as a failed health call.

use serde::Serialize;
use service_core::error::ProxyError;
use tracing::warn;

use crate::services::{Backend, ServiceProxy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Probe answered 2xx.
    Healthy,
    /// Probe answered, but not 2xx.
    Degraded,
    /// Probe timed out or could not connect.
    Unreachable,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Fixed-shape report: the gateway plus one named slot per backend.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateHealthReport {
    pub gateway: HealthState,
    pub projects: BackendHealth,
    pub activity: BackendHealth,
    pub performance: BackendHealth,
    pub labs: BackendHealth,
}

pub async fn health(proxy: &ServiceProxy) -> AggregateHealthReport {
    let (projects, activity, performance, labs) = tokio::join!(
        proxy.probe(Backend::Projects),
        proxy.probe(Backend::Activity),
        proxy.probe(Backend::Performance),
        proxy.probe(Backend::Labs),
    );

    AggregateHealthReport {
        gateway: HealthState::Healthy,
        projects: classify(Backend::Projects, projects),
        activity: classify(Backend::Activity, activity),
        performance: classify(Backend::Performance, performance),
        labs: classify(Backend::Labs, labs),
    }
}

fn classify(backend: Backend, result: Result<u16, ProxyError>) -> BackendHealth {
    match result {
        Ok(status) if (200..300).contains(&status) => BackendHealth {
            state: HealthState::Healthy,
            detail: None,
        },
        Ok(status) => BackendHealth {
            state: HealthState::Degraded,
            detail: Some(format!("status {}", status)),
        },
        Err(err) => {
            warn!(backend = backend.name(), error = %err, "Health probe failed");
            BackendHealth {
                state: HealthState::Unreachable,
                detail: Some(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_statuses_classify() {
        assert_eq!(
            classify(Backend::Labs, Ok(200)).state,
            HealthState::Healthy
        );
        assert_eq!(
            classify(Backend::Labs, Ok(204)).state,
            HealthState::Healthy
        );
        assert_eq!(
            classify(Backend::Labs, Ok(500)).state,
            HealthState::Degraded
        );
        assert_eq!(
            classify(Backend::Labs, Err(ProxyError::Timeout("labs".into()))).state,
            HealthState::Unreachable
        );
    }
}
