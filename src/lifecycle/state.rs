use serde::Serialize;
use std::fmt;

use crate::remote::models::Row;

/// Result of the most recent execute attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    #[default]
    Idle,
    Success(Vec<Row>),
    Failure(String),
}

impl ExecutionOutcome {
    pub fn failure(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Failure(message) => Some(message),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecutionOutcome::Success(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Local validation feedback. Never reaches the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    EmptyPrompt,
    EmptySql,
    NothingToFix,
    FixRequiresExecute,
    NoTableSelected,
    UnknownTable,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Notice::EmptyPrompt => "Please enter a query first.",
            Notice::EmptySql => "There is no SQL to execute.",
            Notice::NothingToFix => "There is no error to fix.",
            Notice::FixRequiresExecute => "Run Execute SQL first, then Fix again if it still fails.",
            Notice::NoTableSelected => "Select a table first.",
            Notice::UnknownTable => "Unknown table.",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryLifecycleState {
    pub user_input: String,
    pub generated_sql: String,
    pub execution_outcome: ExecutionOutcome,
    pub generation_fault: Option<String>,
    /// Set by a successful fix, cleared by the next execute attempt.
    pub fix_guard: bool,
    pub selected_table: Option<String>,
    pub notice: Option<Notice>,
    pub(crate) generation_seq: u64,
    pub(crate) execution_seq: u64,
}

impl QueryLifecycleState {
    pub fn has_error(&self) -> bool {
        self.generation_fault.is_some() || self.execution_outcome.failure().is_some()
    }

    /// The fault shown in the error region; generation faults take precedence.
    pub fn displayed_error(&self) -> Option<&str> {
        self.generation_fault
            .as_deref()
            .or_else(|| self.execution_outcome.failure())
    }

    pub fn default_table_hint(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    pub fn view(&self) -> LifecycleView {
        let has_error = self.has_error();
        LifecycleView {
            user_input: self.user_input.clone(),
            generated_sql: self.generated_sql.clone(),
            execution_outcome: self.execution_outcome.clone(),
            generation_fault: self.generation_fault.clone(),
            displayed_error: self.displayed_error().map(str::to_string),
            has_error,
            fix_guard: self.fix_guard,
            fix_enabled: has_error && !self.fix_guard,
            can_execute: !self.generated_sql.trim().is_empty(),
            can_explain: !self.generated_sql.trim().is_empty(),
            selected_table: self.selected_table.clone(),
            notice: self.notice.map(|n| n.to_string()),
        }
    }
}

/// Everything a renderer needs, derived from [`QueryLifecycleState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleView {
    pub user_input: String,
    pub generated_sql: String,
    pub execution_outcome: ExecutionOutcome,
    pub generation_fault: Option<String>,
    pub displayed_error: Option<String>,
    pub has_error: bool,
    pub fix_guard: bool,
    pub fix_enabled: bool,
    pub can_execute: bool,
    pub can_explain: bool,
    pub selected_table: Option<String>,
    pub notice: Option<String>,
}
