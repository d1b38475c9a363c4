use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A result row: column name to value, in the order the server sent them.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Literal prefix the service uses to mark a generation or repair fault.
pub const GENERATION_FAULT_PREFIX: &str = "AI Error:";

/// Decoded `sql` field of a generate or fix response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlOutcome {
    Statement(String),
    Fault(String),
}

impl SqlOutcome {
    pub fn decode(raw: String) -> Self {
        if raw.starts_with(GENERATION_FAULT_PREFIX) {
            SqlOutcome::Fault(raw)
        } else {
            SqlOutcome::Statement(raw)
        }
    }
}

/// Decoded body of a transport-successful execute call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionReport {
    Rows(Vec<Row>),
    Failed(String),
}

impl From<ExecuteResponse> for ExecutionReport {
    fn from(response: ExecuteResponse) -> Self {
        if response.success {
            ExecutionReport::Rows(response.results.unwrap_or_default())
        } else {
            ExecutionReport::Failed(
                response
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Execution failed".to_string()),
            )
        }
    }
}

// Request bodies

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_table: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteRequest<'a> {
    pub sql: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FixRequest<'a> {
    pub failed_sql: &'a str,
    pub error_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_table: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ExplanationRequest<'a> {
    pub sql: &'a str,
    pub language: &'a str,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub db_name: String,
    pub db_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("db_name", &self.db_name)
            .field("db_password", &"<redacted>")
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// Response bodies

#[derive(Debug, Deserialize)]
pub struct SqlResponse {
    #[serde(default)]
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<Row>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplanationResponse {
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckAuthResponse {
    #[serde(default)]
    pub authenticated: bool,
}

/// Body of a non-success response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        self.error
            .into_iter()
            .chain(self.detail)
            .find(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: Option<bool>,
    #[serde(default)]
    pub foreign_key: Option<String>,
}

/// Table name to column name to metadata.
pub type SchemaMap = BTreeMap<String, BTreeMap<String, ColumnMeta>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub schema: SchemaMap,
    #[serde(default)]
    pub tables: Vec<String>,
}
