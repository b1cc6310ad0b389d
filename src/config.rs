//! Configuration for a crmql database

use std::time::Duration;

/// How the predicate compiler treats a WHERE fragment it cannot recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhereMode {
    /// Drop the fragment (loosening the filter) and log a warning
    #[default]
    Lenient,
    /// Fail the statement with `StoreError::UnsupportedPredicate`
    Strict,
}

/// Configuration for the database and its JSON file store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Quiet period after the last mutation before the document is written
    pub save_debounce_ms: u64,
    /// Treatment of unrecognised WHERE fragments
    pub where_mode: WhereMode,
    /// Pretty-print the persisted document
    pub pretty: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            save_debounce_ms: 100,
            where_mode: WhereMode::Lenient,
            pretty: true,
        }
    }
}

impl DatabaseConfig {
    /// The debounce window as a duration
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
