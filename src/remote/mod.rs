pub mod http;
pub mod models;

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

use models::{Credentials, ExecutionReport, SchemaResponse, SqlOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    ConnectionError(String),
    ResponseError(String),
    /// Non-success status; carries the server's own error text.
    Rejected(String),
    ConfigError(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::ConnectionError(msg) => write!(f, "Query service connection error: {}", msg),
            RemoteError::ResponseError(msg) => write!(f, "Query service response error: {}", msg),
            RemoteError::Rejected(msg) => write!(f, "{}", msg),
            RemoteError::ConfigError(msg) => write!(f, "Query service configuration error: {}", msg),
        }
    }
}

impl Error for RemoteError {}

/// Generation, execution, repair and explanation of statements.
#[async_trait]
pub trait RemoteQueryService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError>;

    async fn execute(&self, sql: &str) -> Result<ExecutionReport, RemoteError>;

    async fn fix(
        &self,
        failed_sql: &str,
        error_message: &str,
        original_prompt: Option<&str>,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError>;

    async fn explain(&self, sql: &str, language: &str) -> Result<String, RemoteError>;
}

/// Authentication and schema lookup for a workspace session.
#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn check_auth(&self) -> bool;

    async fn login(&self, credentials: &Credentials) -> Result<(), RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;

    async fn schema(&self) -> Result<SchemaResponse, RemoteError>;
}
