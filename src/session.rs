use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::SessionConfig;
use crate::lifecycle::bridge;
use crate::lifecycle::language::{self, Language};
use crate::lifecycle::{DisplayRequester, HistoryLog, QueryLifecycleController};
use crate::remote::models::{Credentials, SchemaMap, SchemaResponse};
use crate::remote::{RemoteError, RemoteQueryService, WorkspaceService};

#[derive(Debug)]
pub enum SessionError {
    NotAuthenticated,
    InvalidCredentials(String),
    Remote(RemoteError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotAuthenticated => write!(f, "Not authenticated"),
            SessionError::InvalidCredentials(msg) => write!(f, "{}", msg),
            SessionError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SessionError {}

impl From<RemoteError> for SessionError {
    fn from(e: RemoteError) -> Self {
        SessionError::Remote(e)
    }
}

/// Everything that lives exactly as long as one authenticated session.
pub struct SessionContext {
    pub controller: Arc<QueryLifecycleController>,
    pub history: Arc<RwLock<HistoryLog>>,
    pub schema: SchemaMap,
    language: RwLock<&'static Language>,
    requester: DisplayRequester,
    bridge_task: JoinHandle<()>,
}

impl SessionContext {
    fn open(
        service: Arc<dyn RemoteQueryService>,
        schema: SchemaResponse,
        settings: &SessionConfig,
    ) -> Self {
        let history = Arc::new(RwLock::new(HistoryLog::new()));
        let controller = Arc::new(QueryLifecycleController::new(
            service,
            history.clone(),
            schema.tables,
            settings,
        ));

        let (requester, listener) = bridge::channel();
        let bridge_task = tokio::spawn(listener.run(controller.clone()));

        let language = language::find(&settings.default_language).unwrap_or(&language::LANGUAGES[0]);

        Self {
            controller,
            history,
            schema: schema.schema,
            language: RwLock::new(language),
            requester,
            bridge_task,
        }
    }

    pub fn tables(&self) -> &[String] {
        self.controller.known_tables()
    }

    /// Asks the lifecycle to show every record of `table`. Unknown names are ignored.
    pub fn request_display(&self, table: &str) {
        self.requester.request_display(table);
    }

    pub async fn language(&self) -> &'static Language {
        *self.language.read().await
    }

    pub async fn set_language(&self, language: &'static Language) {
        *self.language.write().await = language;
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.bridge_task.abort();
    }
}

/// Authentication state of the application.
pub enum AuthState {
    Unauthenticated,
    Authenticated(Arc<SessionContext>),
}

/// Drives `Unauthenticated -> Authenticated -> Unauthenticated`.
pub struct SessionManager {
    workspace: Arc<dyn WorkspaceService>,
    queries: Arc<dyn RemoteQueryService>,
    settings: SessionConfig,
    state: RwLock<AuthState>,
}

impl SessionManager {
    pub fn new(
        workspace: Arc<dyn WorkspaceService>,
        queries: Arc<dyn RemoteQueryService>,
        settings: SessionConfig,
    ) -> Self {
        Self {
            workspace,
            queries,
            settings,
            state: RwLock::new(AuthState::Unauthenticated),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.state.read().await, AuthState::Authenticated(_))
    }

    pub async fn current(&self) -> Result<Arc<SessionContext>, SessionError> {
        match &*self.state.read().await {
            AuthState::Authenticated(session) => Ok(session.clone()),
            AuthState::Unauthenticated => Err(SessionError::NotAuthenticated),
        }
    }

    /// Syncs with the service: resumes a session it still recognises and
    /// drops a local one it no longer does.
    pub async fn restore(&self) -> bool {
        if !self.workspace.check_auth().await {
            let previous = std::mem::replace(&mut *self.state.write().await, AuthState::Unauthenticated);
            if matches!(previous, AuthState::Authenticated(_)) {
                warn!("Session no longer recognised by the query service");
            } else {
                info!("No existing session to restore");
            }
            return false;
        }
        if !self.is_authenticated().await {
            self.open_session().await;
        }
        true
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<SessionContext>, SessionError> {
        if credentials.db_name.trim().is_empty() || credentials.db_password.is_empty() {
            return Err(SessionError::InvalidCredentials(
                "Please enter database name and password.".to_string(),
            ));
        }

        let credentials = Credentials {
            db_name: credentials.db_name.trim().to_string(),
            ..credentials.clone()
        };
        self.workspace.login(&credentials).await?;
        Ok(self.open_session().await)
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.workspace.logout().await?;
        let previous = std::mem::replace(&mut *self.state.write().await, AuthState::Unauthenticated);
        if matches!(previous, AuthState::Authenticated(_)) {
            info!("Session closed");
        }
        Ok(())
    }

    async fn open_session(&self) -> Arc<SessionContext> {
        let schema = match self.workspace.schema().await {
            Ok(schema) => schema,
            Err(e) => {
                // The session still opens; the table list is just empty.
                error!("Failed to load schema: {}", e);
                SchemaResponse::default()
            }
        };
        if schema.tables.is_empty() {
            warn!("Schema lists no tables");
        }

        let session = Arc::new(SessionContext::open(self.queries.clone(), schema, &self.settings));
        info!("Session opened with {} tables", session.tables().len());
        *self.state.write().await = AuthState::Authenticated(session.clone());
        session
    }
}
