use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::lifecycle::language::{self, Language, LANGUAGES};
use crate::lifecycle::{ExecutionResult, GenerationResult, LifecycleView};
use crate::remote::models::ColumnMeta;
use crate::session::SessionContext;
use crate::util::csv_export::rows_to_csv;
use crate::web::handlers::auth::session_error;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ExplainRequest {
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub table: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub code: String,
}

// Response types

/// Reply to a lifecycle action: whether it reached the service, what it
/// reported, and the state it left behind.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub accepted: bool,
    pub message: Option<String>,
    pub view: LifecycleView,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub language: &'static Language,
    pub explanation: String,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub number: usize,
    pub prompt: String,
    pub sql: String,
    pub timestamp: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: &'static [Language],
    pub selected: &'static Language,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub authenticated: bool,
    pub backend_url: String,
}

type ApiError = (StatusCode, String);

async fn session(state: &AppState) -> Result<Arc<SessionContext>, ApiError> {
    state.sessions.current().await.map_err(session_error)
}

fn generation_response(result: GenerationResult, view: LifecycleView) -> ActionResponse {
    let (accepted, message) = match result {
        GenerationResult::Rejected(notice) => (false, Some(notice.to_string())),
        GenerationResult::Applied(_) | GenerationResult::Discarded => (true, None),
        GenerationResult::Faulted(fault) => (true, Some(fault)),
    };
    ActionResponse { accepted, message, view }
}

fn execution_response(result: ExecutionResult, view: LifecycleView) -> ActionResponse {
    let (accepted, message) = match result {
        ExecutionResult::Rejected(notice) => (false, Some(notice.to_string())),
        ExecutionResult::Succeeded(_) | ExecutionResult::Discarded => (true, None),
        ExecutionResult::Failed(failure) => (true, Some(failure)),
    };
    ActionResponse { accepted, message, view }
}

// Derived state

pub async fn get_state(State(state): State<Arc<AppState>>) -> Result<Json<LifecycleView>, ApiError> {
    let session = session(&state).await?;
    Ok(Json(session.controller.view().await))
}

pub async fn set_input(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InputRequest>,
) -> Result<Json<LifecycleView>, ApiError> {
    let session = session(&state).await?;
    session.controller.set_user_input(payload.text).await;
    Ok(Json(session.controller.view().await))
}

// Lifecycle actions

pub async fn generate(State(state): State<Arc<AppState>>) -> Result<Json<ActionResponse>, ApiError> {
    let session = session(&state).await?;
    let result = session.controller.generate().await;
    debug!("Generate finished: {:?}", result);
    Ok(Json(generation_response(result, session.controller.view().await)))
}

pub async fn execute(State(state): State<Arc<AppState>>) -> Result<Json<ActionResponse>, ApiError> {
    let session = session(&state).await?;
    let result = session.controller.execute_generated().await;
    debug!("Execute finished: {:?}", result);
    Ok(Json(execution_response(result, session.controller.view().await)))
}

pub async fn fix(State(state): State<Arc<AppState>>) -> Result<Json<ActionResponse>, ApiError> {
    let session = session(&state).await?;
    let result = session.controller.fix().await;
    debug!("Fix finished: {:?}", result);
    Ok(Json(generation_response(result, session.controller.view().await)))
}

pub async fn display_table(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActionResponse>, ApiError> {
    let session = session(&state).await?;
    let result = session.controller.display_table().await;
    Ok(Json(execution_response(result, session.controller.view().await)))
}

pub async fn explain(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<ExplainRequest>>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let session = session(&state).await?;
    let requested = payload.map(|Json(p)| p).unwrap_or_default();

    let language = match requested.language {
        Some(code) => language::find(&code).ok_or_else(|| {
            (StatusCode::BAD_REQUEST, format!("Unsupported language: {}", code))
        })?,
        None => session.language().await,
    };

    let explanation = session
        .controller
        .explain(language.code)
        .await
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Generate SQL first".to_string()))?;

    Ok(Json(ExplainResponse {
        language,
        explanation,
    }))
}

// Table browsing

pub async fn list_tables(State(state): State<Arc<AppState>>) -> Result<Json<TablesResponse>, ApiError> {
    let session = session(&state).await?;
    let selected = session.controller.snapshot().await.selected_table;
    Ok(Json(TablesResponse {
        tables: session.tables().to_vec(),
        selected,
    }))
}

pub async fn get_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<BTreeMap<String, ColumnMeta>>, ApiError> {
    let session = session(&state).await?;
    session
        .schema
        .get(&table)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Table '{}' not found", table)))
}

pub async fn select_table(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TableRequest>,
) -> Result<Json<LifecycleView>, ApiError> {
    let session = session(&state).await?;
    let table = payload.table.trim();
    if table != "None" && !table.is_empty() && !session.tables().iter().any(|t| t == table) {
        return Err((StatusCode::BAD_REQUEST, format!("Table '{}' not found", table)));
    }

    session.controller.on_table_selection_changed(table).await;
    Ok(Json(session.controller.view().await))
}

pub async fn display_all(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TableRequest>,
) -> Result<StatusCode, ApiError> {
    let session = session(&state).await?;
    session.request_display(&payload.table);
    Ok(StatusCode::ACCEPTED)
}

// History, languages and export

pub async fn history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let session = session(&state).await?;
    let history = session.history.read().await;
    let total = history.len();

    let items = history
        .latest_first()
        .enumerate()
        .map(|(i, entry)| HistoryItem {
            number: total - i,
            prompt: entry.prompt.clone(),
            sql: entry.sql.clone(),
            timestamp: entry.display_timestamp(),
            username: entry.username.clone(),
        })
        .collect();

    Ok(Json(items))
}

pub async fn list_languages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    let session = session(&state).await?;
    Ok(Json(LanguagesResponse {
        languages: LANGUAGES,
        selected: session.language().await,
    }))
}

pub async fn set_language(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LanguageRequest>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    let session = session(&state).await?;
    let language = language::find(&payload.code).ok_or_else(|| {
        (StatusCode::BAD_REQUEST, format!("Unsupported language: {}", payload.code))
    })?;

    session.set_language(language).await;
    info!("Explanation language set to {}", language.code);
    Ok(Json(LanguagesResponse {
        languages: LANGUAGES,
        selected: language,
    }))
}

pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let session = session(&state).await?;
    let rows = session
        .controller
        .result_rows()
        .await
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| (StatusCode::NOT_FOUND, "No results to export".to_string()))?;

    let csv = rows_to_csv(&rows).map_err(|e| {
        error!("Failed to export results: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to export results: {}", e))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"query_results.csv\""),
        ],
        csv,
    ))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now().signed_duration_since(state.startup_time);

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
        authenticated: state.sessions.is_authenticated().await,
        backend_url: state.config.backend.base_url.clone(),
    })
}
