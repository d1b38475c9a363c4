use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::lifecycle::controller::QueryLifecycleController;

/// The statement a "display all records" request expands to.
pub fn canonical_statement(table: &str) -> String {
    format!("SELECT * FROM {} LIMIT 100;", table)
}

/// Creates the two ends of the table auto-run signal.
///
/// The channel holds a single slot: a request raised before the previous one
/// was picked up replaces it.
pub fn channel() -> (DisplayRequester, TableAutoRunBridge) {
    let (tx, rx) = watch::channel(None);
    (DisplayRequester { tx }, TableAutoRunBridge { rx })
}

/// Raising side, held by whatever lists the tables.
#[derive(Debug)]
pub struct DisplayRequester {
    tx: watch::Sender<Option<String>>,
}

impl DisplayRequester {
    /// Fire-and-forget; never blocks and never fails.
    pub fn request_display(&self, table: &str) {
        debug!("Display requested for table '{}'", table);
        self.tx.send_replace(Some(table.to_string()));
    }
}

/// Listening side. There is exactly one, consumed by [`TableAutoRunBridge::run`].
#[derive(Debug)]
pub struct TableAutoRunBridge {
    rx: watch::Receiver<Option<String>>,
}

impl TableAutoRunBridge {
    /// Forwards requests to the controller until the requester is dropped.
    pub async fn run(mut self, controller: Arc<QueryLifecycleController>) {
        while self.rx.changed().await.is_ok() {
            let requested = self.rx.borrow_and_update().clone();
            if let Some(table) = requested {
                controller.display_all_records(&table).await;
            }
        }
        info!("Table auto-run bridge closed");
    }
}
