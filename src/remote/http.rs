use crate::config::BackendConfig;
use crate::remote::models::{
    CheckAuthResponse, Credentials, ErrorBody, ExecuteRequest, ExecuteResponse, ExecutionReport,
    ExplanationRequest, ExplanationResponse, FixRequest, GenerateRequest, SchemaResponse,
    SqlOutcome, SqlResponse,
};
use crate::remote::{RemoteError, RemoteQueryService, WorkspaceService};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Client for the query service's JSON API. Keeps the session cookie
/// issued at login for every later call.
pub struct HttpQueryService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQueryService {
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::ConfigError(
                "Base URL is required for the query service".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;

        Self::read_body(response, fallback).await
    }

    async fn read_body<T: DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = body.message().unwrap_or_else(|| fallback.to_string());
            warn!("Query service responded with status code {}: {}", status, message);
            return Err(RemoteError::Rejected(message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::ResponseError(e.to_string()))
    }
}

#[async_trait]
impl RemoteQueryService for HttpQueryService {
    async fn generate(
        &self,
        prompt: &str,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError> {
        info!("Requesting SQL generation (default table: {:?})", default_table);
        let request = GenerateRequest { prompt, default_table };
        let response: SqlResponse = self
            .post_json("generate-sql", &request, "Generate failed")
            .await?;
        Ok(SqlOutcome::decode(response.sql))
    }

    async fn execute(&self, sql: &str) -> Result<ExecutionReport, RemoteError> {
        info!("Executing SQL: {}", sql);
        let url = self.endpoint("execute");

        let response = self
            .client
            .post(&url)
            .json(&ExecuteRequest { sql })
            .send()
            .await
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;

        // A logical failure arrives with a success status; only the payload flag decides.
        let response: ExecuteResponse = Self::read_body(response, "Execute failed").await?;
        Ok(ExecutionReport::from(response))
    }

    async fn fix(
        &self,
        failed_sql: &str,
        error_message: &str,
        original_prompt: Option<&str>,
        default_table: Option<&str>,
    ) -> Result<SqlOutcome, RemoteError> {
        info!("Requesting SQL fix for error: {}", error_message);
        let request = FixRequest {
            failed_sql,
            error_message,
            original_prompt,
            default_table,
        };
        let response: SqlResponse = self.post_json("fix-sql", &request, "Fix failed").await?;
        Ok(SqlOutcome::decode(response.sql))
    }

    async fn explain(&self, sql: &str, language: &str) -> Result<String, RemoteError> {
        info!("Requesting explanation in '{}'", language);
        let request = ExplanationRequest { sql, language };
        let response: ExplanationResponse = self
            .post_json("explanation", &request, "Explanation failed")
            .await?;
        Ok(response.explanation)
    }
}

#[async_trait]
impl WorkspaceService for HttpQueryService {
    async fn check_auth(&self) -> bool {
        let url = self.endpoint("check-auth");
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Auth check failed: {}", e);
                return false;
            }
        };

        match response.json::<CheckAuthResponse>().await {
            Ok(body) => body.authenticated,
            Err(e) => {
                debug!("Auth check returned an unreadable body: {}", e);
                false
            }
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), RemoteError> {
        info!("Logging in to database '{}'", credentials.db_name);
        let _: serde_json::Value = self.post_json("login", credentials, "Login failed").await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        info!("Logging out");
        let url = self.endpoint("logout");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;
        let _: serde_json::Value = Self::read_body(response, "Logout failed").await?;
        Ok(())
    }

    async fn schema(&self) -> Result<SchemaResponse, RemoteError> {
        let url = self.endpoint("schema");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;
        Self::read_body(response, "Failed to load schema").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(String, Value)>>>;

    fn capture(captured: &Captured, name: &str, body: &Value) {
        captured.lock().unwrap().push((name.to_string(), body.clone()));
    }

    async fn generate(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
        capture(&captured, "generate", &body);
        match body["prompt"].as_str() {
            Some("break it") => Json(json!({"sql": "AI Error: Invalid API key."})),
            _ => Json(json!({"sql": "SELECT * FROM users;"})),
        }
    }

    async fn execute(
        State(captured): State<Captured>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        capture(&captured, "execute", &body);
        match body["sql"].as_str() {
            Some("SELECT * FROM usrs;") => (
                StatusCode::OK,
                Json(json!({"success": false, "error": "no such table: usrs", "results": null})),
            ),
            Some("") => (StatusCode::BAD_REQUEST, Json(json!({"detail": "SQL required"}))),
            _ => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "error": null,
                    "results": [{"name": "ada", "id": 1}, {"name": "grace", "id": 2}]
                })),
            ),
        }
    }

    async fn fix_sql(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
        capture(&captured, "fix", &body);
        Json(json!({"sql": "SELECT * FROM users;"}))
    }

    async fn explanation(
        State(captured): State<Captured>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        capture(&captured, "explanation", &body);
        if body["language"] == "xx" {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))));
        }
        Ok(Json(json!({"explanation": "Lists every user."})))
    }

    async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["db_password"] == "wrong" {
            (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Access denied"})))
        } else {
            (StatusCode::OK, Json(json!({"success": true})))
        }
    }

    async fn schema() -> Json<Value> {
        Json(json!({
            "schema": {"users": {"id": {"type": "int", "primary_key": true, "foreign_key": null}}},
            "tables": ["users"]
        }))
    }

    /// Stand-in for the query service on an ephemeral local port.
    async fn spawn_service(captured: Captured) -> String {
        let app = Router::new()
            .route("/api/generate-sql", post(generate))
            .route("/api/execute", post(execute))
            .route("/api/fix-sql", post(fix_sql))
            .route("/api/explanation", post(explanation))
            .route("/api/check-auth", get(|| async { Json(json!({"authenticated": true})) }))
            .route("/api/login", post(login))
            .route("/api/schema", get(schema))
            .with_state(captured);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> HttpQueryService {
        HttpQueryService::new(&BackendConfig {
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn generate_sends_wire_fields_and_decodes_sentinel() {
        let captured = Captured::default();
        let service = client_for(spawn_service(captured.clone()).await);

        let outcome = service.generate("show all users", Some("users")).await.unwrap();
        assert_eq!(outcome, SqlOutcome::Statement("SELECT * FROM users;".to_string()));

        let outcome = service.generate("break it", None).await.unwrap();
        assert_eq!(outcome, SqlOutcome::Fault("AI Error: Invalid API key.".to_string()));

        let calls = captured.lock().unwrap().clone();
        assert_eq!(calls[0].1, json!({"prompt": "show all users", "default_table": "users"}));
        assert_eq!(calls[1].1, json!({"prompt": "break it"}));
    }

    #[tokio::test]
    async fn execute_distinguishes_logical_and_transport_failures() {
        let service = client_for(spawn_service(Captured::default()).await);

        match service.execute("SELECT * FROM users;").await.unwrap() {
            ExecutionReport::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                let columns: Vec<&String> = rows[0].keys().collect();
                assert_eq!(columns, vec!["name", "id"]);
            }
            other => panic!("expected rows, got {:?}", other),
        }

        assert_eq!(
            service.execute("SELECT * FROM usrs;").await.unwrap(),
            ExecutionReport::Failed("no such table: usrs".to_string())
        );

        assert_eq!(
            service.execute("").await.unwrap_err(),
            RemoteError::Rejected("SQL required".to_string())
        );
    }

    #[tokio::test]
    async fn fix_omits_absent_prompt() {
        let captured = Captured::default();
        let service = client_for(spawn_service(captured.clone()).await);

        let outcome = service
            .fix("SELECT * FROM usrs;", "no such table: usrs", None, Some("users"))
            .await
            .unwrap();
        assert_eq!(outcome, SqlOutcome::Statement("SELECT * FROM users;".to_string()));

        let calls = captured.lock().unwrap().clone();
        assert_eq!(
            calls[0].1,
            json!({
                "failed_sql": "SELECT * FROM usrs;",
                "error_message": "no such table: usrs",
                "default_table": "users"
            })
        );
    }

    #[tokio::test]
    async fn explanation_error_without_detail_uses_fallback() {
        let service = client_for(spawn_service(Captured::default()).await);

        assert_eq!(
            service.explain("SELECT 1;", "en").await.unwrap(),
            "Lists every user."
        );
        assert_eq!(
            service.explain("SELECT 1;", "xx").await.unwrap_err(),
            RemoteError::Rejected("Explanation failed".to_string())
        );
    }

    #[tokio::test]
    async fn workspace_calls_round_trip() {
        let service = client_for(spawn_service(Captured::default()).await);

        assert!(service.check_auth().await);

        let credentials = Credentials {
            db_name: "shop".to_string(),
            db_password: "wrong".to_string(),
            google_api_key: None,
        };
        assert_eq!(
            service.login(&credentials).await.unwrap_err(),
            RemoteError::Rejected("Access denied".to_string())
        );

        let schema = service.schema().await.unwrap();
        assert_eq!(schema.tables, vec!["users".to_string()]);
        assert_eq!(schema.schema["users"]["id"].data_type, "int");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_connection_error() {
        // Port 9 (discard) is not served locally.
        let service = client_for("http://127.0.0.1:9".to_string());

        assert!(matches!(
            service.generate("show all users", None).await,
            Err(RemoteError::ConnectionError(_))
        ));
        assert!(!service.check_auth().await);
    }
}
