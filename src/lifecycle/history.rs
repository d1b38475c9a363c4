use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

/// One successful generation. Entries are only ever handed out by shared
/// reference once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptHistoryEntry {
    pub prompt: String,
    pub sql: String,
    pub timestamp: DateTime<Utc>,
    pub username: String,
}

impl PromptHistoryEntry {
    pub fn new(prompt: impl Into<String>, sql: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            sql: sql.into(),
            timestamp: Utc::now().trunc_subsecs(0),
            username: username.into(),
        }
    }

    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Append-only record of generations for one session, stored oldest first.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<PromptHistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: PromptHistoryEntry) {
        self.entries.push(entry);
    }

    /// Newest entry first; the stored order is untouched.
    pub fn latest_first(&self) -> impl DoubleEndedIterator<Item = &PromptHistoryEntry> + ExactSizeIterator {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_first_does_not_reorder_storage() {
        let mut log = HistoryLog::new();
        log.append(PromptHistoryEntry::new("first", "SELECT 1;", "User"));
        log.append(PromptHistoryEntry::new("second", "SELECT 2;", "User"));
        log.append(PromptHistoryEntry::new("third", "SELECT 3;", "User"));

        let newest: Vec<&str> = log.latest_first().map(|e| e.prompt.as_str()).collect();
        assert_eq!(newest, vec!["third", "second", "first"]);

        let stored: Vec<&str> = log.entries.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(stored, vec!["first", "second", "third"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn timestamps_have_second_precision() {
        let entry = PromptHistoryEntry::new("show all users", "SELECT * FROM users;", "User");
        assert_eq!(entry.timestamp.timestamp_subsec_nanos(), 0);
        assert_eq!(entry.display_timestamp().len(), "2026-01-01 00:00:00".len());
    }
}
