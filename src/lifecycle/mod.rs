//! The query lifecycle: generate, inspect, execute, diagnose and fix a
//! statement while keeping a history of what was generated.

pub mod bridge;
pub mod controller;
pub mod history;
pub mod language;
pub mod state;

pub use bridge::DisplayRequester;
pub use controller::{ExecutionResult, GenerationResult, QueryLifecycleController};
pub use history::HistoryLog;
pub use state::LifecycleView;
