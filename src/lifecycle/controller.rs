use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ResponseOrdering, SessionConfig};
use crate::lifecycle::bridge::canonical_statement;
use crate::lifecycle::history::{HistoryLog, PromptHistoryEntry};
use crate::lifecycle::state::{ExecutionOutcome, LifecycleView, Notice, QueryLifecycleState};
use crate::remote::models::{ExecutionReport, Row, SqlOutcome};
use crate::remote::{RemoteError, RemoteQueryService};

/// Shown in place of an explanation the service could not produce.
pub const EXPLANATION_FALLBACK: &str = "Failed to load explanation.";

/// What a generate or fix action did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// Not sent to the service.
    Rejected(Notice),
    /// `generated_sql` now holds this statement.
    Applied(String),
    /// `generation_fault` now holds this message.
    Faulted(String),
    /// A newer request owns the state; the response was dropped.
    Discarded,
}

/// What an execute attempt did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Rejected(Notice),
    /// Row count of the new result set.
    Succeeded(usize),
    Failed(String),
    Discarded,
}

/// Owns the query lifecycle of one session: the draft prompt, the current
/// statement, the last execution outcome and the fix guard.
///
/// The state lock is never held across a service call, so actions may
/// overlap. How overlapping responses are reconciled is decided by
/// [`ResponseOrdering`].
pub struct QueryLifecycleController {
    service: Arc<dyn RemoteQueryService>,
    state: Mutex<QueryLifecycleState>,
    history: Arc<RwLock<HistoryLog>>,
    known_tables: Vec<String>,
    explanations: Mutex<HashMap<(String, String), String>>,
    username: String,
    ordering: ResponseOrdering,
}

impl QueryLifecycleController {
    pub fn new(
        service: Arc<dyn RemoteQueryService>,
        history: Arc<RwLock<HistoryLog>>,
        known_tables: Vec<String>,
        settings: &SessionConfig,
    ) -> Self {
        Self {
            service,
            state: Mutex::new(QueryLifecycleState::default()),
            history,
            known_tables,
            explanations: Mutex::new(HashMap::new()),
            username: settings.username.clone(),
            ordering: settings.response_ordering,
        }
    }

    pub fn known_tables(&self) -> &[String] {
        &self.known_tables
    }

    pub async fn view(&self) -> LifecycleView {
        self.state.lock().await.view()
    }

    pub async fn snapshot(&self) -> QueryLifecycleState {
        self.state.lock().await.clone()
    }

    pub async fn result_rows(&self) -> Option<Vec<Row>> {
        self.state.lock().await.execution_outcome.rows().map(<[Row]>::to_vec)
    }

    pub async fn set_user_input(&self, text: impl Into<String>) {
        self.state.lock().await.user_input = text.into();
    }

    fn is_stale(&self, ticket: u64, current: u64) -> bool {
        self.ordering == ResponseOrdering::DiscardStale && ticket != current
    }

    /// Turns the current draft into SQL.
    pub async fn generate(&self) -> GenerationResult {
        let (prompt, default_table, ticket) = {
            let mut state = self.state.lock().await;
            if state.user_input.trim().is_empty() {
                state.notice = Some(Notice::EmptyPrompt);
                return GenerationResult::Rejected(Notice::EmptyPrompt);
            }
            state.notice = None;
            state.generation_fault = None;
            // A failure belongs to the statement being replaced; rows stay.
            if state.execution_outcome.failure().is_some() {
                state.execution_outcome = ExecutionOutcome::Idle;
            }
            state.generation_seq += 1;
            (
                state.user_input.clone(),
                state.default_table_hint().map(str::to_string),
                state.generation_seq,
            )
        };

        info!("Generating SQL for prompt: {}", prompt);
        let response = self.service.generate(&prompt, default_table.as_deref()).await;

        let sql = {
            let mut state = self.state.lock().await;
            if self.is_stale(ticket, state.generation_seq) {
                debug!("Dropping superseded generate response #{}", ticket);
                return GenerationResult::Discarded;
            }

            match response {
                Ok(SqlOutcome::Statement(sql)) => {
                    state.generated_sql = sql.clone();
                    state.generation_fault = None;
                    sql
                }
                Ok(SqlOutcome::Fault(fault)) => {
                    warn!("Generate SQL fault: {}", fault);
                    state.generation_fault = Some(fault.clone());
                    return GenerationResult::Faulted(fault);
                }
                Err(e) => {
                    let message = fault_message(&e, "Generate SQL failed");
                    warn!("Generate SQL error: {}", message);
                    state.generation_fault = Some(message.clone());
                    return GenerationResult::Faulted(message);
                }
            }
        };

        if !sql.is_empty() {
            self.history
                .write()
                .await
                .append(PromptHistoryEntry::new(prompt, sql.clone(), self.username.clone()));
        }
        GenerationResult::Applied(sql)
    }

    /// Runs the current statement.
    pub async fn execute_generated(&self) -> ExecutionResult {
        let sql = self.state.lock().await.generated_sql.clone();
        self.execute(&sql).await
    }

    /// Runs `sql`, replacing the execution outcome wholesale.
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        if sql.trim().is_empty() {
            return ExecutionResult::Rejected(Notice::EmptySql);
        }

        let ticket = {
            let mut state = self.state.lock().await;
            // An attempt, successful or not, re-arms fixing.
            state.fix_guard = false;
            state.notice = None;
            state.generation_fault = None;
            state.execution_seq += 1;
            state.execution_seq
        };

        let response = self.service.execute(sql).await;

        let mut state = self.state.lock().await;
        if self.is_stale(ticket, state.execution_seq) {
            debug!("Dropping superseded execute response #{}", ticket);
            return ExecutionResult::Discarded;
        }

        let message = match response {
            Ok(ExecutionReport::Rows(rows)) => {
                let count = rows.len();
                info!("Query returned {} rows", count);
                state.execution_outcome = ExecutionOutcome::Success(rows);
                return ExecutionResult::Succeeded(count);
            }
            Ok(ExecutionReport::Failed(message)) => message,
            Err(e) => fault_message(&e, "Execution failed"),
        };

        warn!("Execute error: {}", message);
        state.execution_outcome = ExecutionOutcome::Failure(message.clone());
        ExecutionResult::Failed(message)
    }

    /// Asks the service to repair the current statement against the active fault.
    pub async fn fix(&self) -> GenerationResult {
        let (failed_sql, error_message, original_prompt, default_table, ticket) = {
            let mut state = self.state.lock().await;
            if !state.has_error() {
                return GenerationResult::Rejected(Notice::NothingToFix);
            }
            if state.fix_guard {
                return GenerationResult::Rejected(Notice::FixRequiresExecute);
            }

            let error_message = state
                .displayed_error()
                .unwrap_or("Unknown error")
                .to_string();
            let original_prompt =
                (!state.user_input.is_empty()).then(|| state.user_input.clone());

            state.notice = None;
            state.generation_fault = None;
            state.generation_seq += 1;
            (
                state.generated_sql.clone(),
                error_message,
                original_prompt,
                state.default_table_hint().map(str::to_string),
                state.generation_seq,
            )
        };

        info!("Fixing SQL after error: {}", error_message);
        let response = self
            .service
            .fix(
                &failed_sql,
                &error_message,
                original_prompt.as_deref(),
                default_table.as_deref(),
            )
            .await;

        let mut state = self.state.lock().await;
        if self.is_stale(ticket, state.generation_seq) {
            debug!("Dropping superseded fix response #{}", ticket);
            return GenerationResult::Discarded;
        }

        match response {
            Ok(SqlOutcome::Statement(sql)) => {
                state.generated_sql = sql.clone();
                state.generation_fault = None;
                if state.execution_outcome.failure().is_some() {
                    state.execution_outcome = ExecutionOutcome::Idle;
                }
                state.fix_guard = true;
                GenerationResult::Applied(sql)
            }
            Ok(SqlOutcome::Fault(fault)) => {
                warn!("Fix SQL fault: {}", fault);
                state.generation_fault = Some(fault.clone());
                GenerationResult::Faulted(fault)
            }
            Err(e) => {
                let message = fault_message(&e, "Fix SQL failed");
                warn!("Fix SQL error: {}", message);
                state.generation_fault = Some(message.clone());
                GenerationResult::Faulted(message)
            }
        }
    }

    /// Explains the current statement in `language`. `None` when there is no statement.
    pub async fn explain(&self, language: &str) -> Option<String> {
        let sql = self.state.lock().await.generated_sql.clone();
        if sql.trim().is_empty() {
            return None;
        }

        let key = (sql, language.to_string());
        if let Some(cached) = self.explanations.lock().await.get(&key) {
            debug!("Reusing cached explanation ({})", language);
            return Some(cached.clone());
        }

        match self.service.explain(&key.0, language).await {
            Ok(text) => {
                self.explanations.lock().await.insert(key, text.clone());
                Some(text)
            }
            Err(e) => {
                warn!("Explanation error: {}", e);
                Some(EXPLANATION_FALLBACK.to_string())
            }
        }
    }

    /// Records the browsed table and drops results that belonged to the old one.
    /// The draft, the statement and any generation fault are kept.
    pub async fn on_table_selection_changed(&self, new_table: &str) {
        let mut state = self.state.lock().await;
        let table = new_table.trim();
        state.selected_table = (!table.is_empty() && table != "None").then(|| table.to_string());
        state.execution_outcome = ExecutionOutcome::Idle;
        // Outstanding executes belong to the previous table.
        state.execution_seq += 1;
        info!("Selected table: {:?}", state.selected_table);
    }

    /// Shows the first rows of the selected table without replacing the statement.
    pub async fn display_table(&self) -> ExecutionResult {
        let selected = self.state.lock().await.selected_table.clone();
        match selected {
            Some(table) => self.execute(&canonical_statement(&table)).await,
            None => ExecutionResult::Rejected(Notice::NoTableSelected),
        }
    }

    /// Replays "type `SELECT * FROM <table> LIMIT 100;` and press execute".
    /// Unknown tables are ignored without touching state.
    pub async fn display_all_records(&self, table: &str) -> ExecutionResult {
        if !self.known_tables.iter().any(|t| t == table) {
            debug!("Ignoring display request for unknown table '{}'", table);
            return ExecutionResult::Rejected(Notice::UnknownTable);
        }

        let sql = canonical_statement(table);
        {
            let mut state = self.state.lock().await;
            state.generated_sql = sql.clone();
            state.execution_outcome = ExecutionOutcome::Idle;
        }
        self.execute(&sql).await
    }
}

fn fault_message(error: &RemoteError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
