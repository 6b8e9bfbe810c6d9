use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries returned by a mutation query.
pub const DEFAULT_MUTATION_LIMIT: usize = 10;

/// Runtime settings for the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Longest wait for exclusive access before an operation fails with a conflict.
    pub lock_timeout: Duration,
    /// Cap on entries returned by a mutation query.
    pub mutation_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("ledger.db"),
            lock_timeout: Duration::from_secs(5),
            mutation_limit: DEFAULT_MUTATION_LIMIT,
        }
    }
}
