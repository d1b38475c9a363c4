use crate::config::AppConfig;
use crate::remote::{RemoteQueryService, WorkspaceService};
use crate::session::SessionManager;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionManager,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        workspace: Arc<dyn WorkspaceService>,
        queries: Arc<dyn RemoteQueryService>,
    ) -> Self {
        let sessions = SessionManager::new(workspace, queries, config.session.clone());

        Self {
            config,
            sessions,
            startup_time: chrono::Utc::now(),
        }
    }
}
