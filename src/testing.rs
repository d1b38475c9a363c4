//! Scripted stand-ins for the query service, shared by unit tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::remote::models::{
    ColumnMeta, Credentials, ExecutionReport, Row, SchemaResponse, SqlOutcome,
};
use crate::remote::{RemoteError, RemoteQueryService, WorkspaceService};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Generate {
        prompt: String,
        default_table: Option<String>,
    },
    Execute(String),
    Fix {
        failed_sql: String,
        error_message: String,
        original_prompt: Option<String>,
        default_table: Option<String>,
    },
    Explain {
        sql: String,
        language: String,
    },
    Login(String),
    Logout,
    Schema,
}

/// Replies are consumed in order; an empty queue falls back to a benign success.
#[derive(Default)]
pub struct FakeService {
    pub generate_replies: Mutex<VecDeque<Result<SqlOutcome, RemoteError>>>,
    pub execute_replies: Mutex<VecDeque<Result<ExecutionReport, RemoteError>>>,
    pub fix_replies: Mutex<VecDeque<Result<SqlOutcome, RemoteError>>>,
    pub explain_replies: Mutex<VecDeque<Result<String, RemoteError>>>,
    pub login_replies: Mutex<VecDeque<Result<(), RemoteError>>>,
    pub logout_replies: Mutex<VecDeque<Result<(), RemoteError>>>,
    pub schema_reply: Mutex<Option<Result<SchemaResponse, RemoteError>>>,
    pub authenticated: Mutex<bool>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_generate(&self, reply: Result<SqlOutcome, RemoteError>) -> &Self {
        self.generate_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_execute(&self, reply: Result<ExecutionReport, RemoteError>) -> &Self {
        self.execute_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_fix(&self, reply: Result<SqlOutcome, RemoteError>) -> &Self {
        self.fix_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_explain(&self, reply: Result<String, RemoteError>) -> &Self {
        self.explain_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn rows(values: serde_json::Value) -> Vec<Row> {
    values
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}

pub fn schema_with(tables: &[&str]) -> SchemaResponse {
    let mut response = SchemaResponse::default();
    for table in tables {
        let mut columns = std::collections::BTreeMap::new();
        columns.insert(
            "id".to_string(),
            ColumnMeta {
                data_type: "int".to_string(),
                primary_key: Some(true),
                foreign_key: None,
            },
        );
        response.schema.insert(table.to_string(), columns);
        response.tables.push(table.to_string());
    }
    response
}

#[async_trait]
impl RemoteQueryService for FakeService {
    async fn generate(
        &self,
        prompt: &str,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError> {
        self.record(Call::Generate {
            prompt: prompt.to_string(),
            default_table: default_table.map(str::to_string),
        });
        self.generate_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SqlOutcome::Statement("SELECT 1;".to_string())))
    }

    async fn execute(&self, sql: &str) -> Result<ExecutionReport, RemoteError> {
        self.record(Call::Execute(sql.to_string()));
        self.execute_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutionReport::Rows(rows(json!([{"ok": 1}])))))
    }

    async fn fix(
        &self,
        failed_sql: &str,
        error_message: &str,
        original_prompt: Option<&str>,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError> {
        self.record(Call::Fix {
            failed_sql: failed_sql.to_string(),
            error_message: error_message.to_string(),
            original_prompt: original_prompt.map(str::to_string),
            default_table: default_table.map(str::to_string),
        });
        self.fix_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SqlOutcome::Statement("SELECT 1;".to_string())))
    }

    async fn explain(&self, sql: &str, language: &str) -> Result<String, RemoteError> {
        self.record(Call::Explain {
            sql: sql.to_string(),
            language: language.to_string(),
        });
        self.explain_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Explains {} in {}", sql, language)))
    }
}

#[async_trait]
impl WorkspaceService for FakeService {
    async fn check_auth(&self) -> bool {
        *self.authenticated.lock().unwrap()
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), RemoteError> {
        self.record(Call::Login(credentials.db_name.clone()));
        let reply = self.login_replies.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if reply.is_ok() {
            *self.authenticated.lock().unwrap() = true;
        }
        reply
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.record(Call::Logout);
        let reply = self.logout_replies.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if reply.is_ok() {
            *self.authenticated.lock().unwrap() = false;
        }
        reply
    }

    async fn schema(&self) -> Result<SchemaResponse, RemoteError> {
        self.record(Call::Schema);
        self.schema_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(schema_with(&["users", "orders"])))
    }
}
