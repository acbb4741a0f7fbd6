use std::sync::Arc;

use collab_engine::CollaborationScope;

use crate::config::OrchestratorConfig;
use crate::directory::DirectoryStore;
use crate::services::{ServiceProxy, TokenService};

/// Shared handles for the request path. Cheap to clone; every field is an Arc
/// or Copy.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub directory: Arc<dyn DirectoryStore>,
    pub proxy: Arc<ServiceProxy>,
    pub collaboration_scope: CollaborationScope,
}

impl AppState {
    pub fn new(config: &OrchestratorConfig, directory: Arc<dyn DirectoryStore>) -> Result<Self, service_core::error::AppError> {
        Ok(Self {
            tokens: Arc::new(TokenService::new(
                &config.token.secret,
                config.token.expiry_days,
            )),
            directory,
            proxy: Arc::new(ServiceProxy::new(
                config.backends.clone(),
                config.trust.secret.clone(),
                config.proxy.clone(),
            )?),
            collaboration_scope: config.collaboration_scope,
        })
    }
}
