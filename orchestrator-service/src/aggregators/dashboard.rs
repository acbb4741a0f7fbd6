//! Cross-service dashboard fan-out.
//!
//! One concurrent branch per backend. A failed branch degrades to an empty
//! section carrying its error; the shape of the view never changes, so the
//! merged result is the same for every completion interleaving. Only when
//! every branch fails does the whole call fail.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use tracing::warn;

use crate::directory::OrganizationContext;
use crate::services::{Backend, ServiceProxy};

const PROJECTS_PATH: &str = "/api/v1/projects";
const ACTIVITY_PATH: &str = "/api/v1/activity/summary/today";
const PERFORMANCE_PATH: &str = "/api/v1/goals/summary";
const LABS_PATH: &str = "/api/v1/labs";

/// One slot of the dashboard: either data or an error marker, never both.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSection {
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DashboardSection {
    fn from_result(backend: Backend, result: Result<Value, AppError>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(err) => {
                warn!(backend = backend.name(), error = %err, "Dashboard branch failed");
                Self {
                    data: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Fixed-shape merged view: one named slot per backend.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub projects: DashboardSection,
    pub activity: DashboardSection,
    pub performance: DashboardSection,
    pub labs: DashboardSection,
}

pub async fn dashboard(
    proxy: &ServiceProxy,
    context: &OrganizationContext,
) -> Result<DashboardView, AppError> {
    let fetch = |backend: Backend, path: &'static str| async move {
        proxy
            .call(Method::GET, backend, path, context, None)
            .await
            .map(|response| response.body)
    };

    let (projects, activity, performance, labs) = tokio::join!(
        fetch(Backend::Projects, PROJECTS_PATH),
        fetch(Backend::Activity, ACTIVITY_PATH),
        fetch(Backend::Performance, PERFORMANCE_PATH),
        fetch(Backend::Labs, LABS_PATH),
    );

    let view = DashboardView {
        projects: DashboardSection::from_result(Backend::Projects, projects),
        activity: DashboardSection::from_result(Backend::Activity, activity),
        performance: DashboardSection::from_result(Backend::Performance, performance),
        labs: DashboardSection::from_result(Backend::Labs, labs),
    };

    if view.projects.failed()
        && view.activity.failed()
        && view.performance.failed()
        && view.labs.failed()
    {
        return Err(AppError::AggregateUnavailable);
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::error::ProxyError;

    #[test]
    fn section_keeps_data_or_error_exclusively() {
        let ok = DashboardSection::from_result(Backend::Labs, Ok(serde_json::json!([1, 2])));
        assert!(ok.data.is_some());
        assert!(ok.error.is_none());

        let failed = DashboardSection::from_result(
            Backend::Labs,
            Err(ProxyError::Timeout("labs".into()).into()),
        );
        assert!(failed.data.is_none());
        assert!(failed.error.is_some());
    }
}
