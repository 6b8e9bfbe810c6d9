use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::error::LedgerError;
use crate::config::LedgerConfig;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    account_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT    NOT NULL,
    balance    INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0)
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    entry_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id     INTEGER,
    account_id      INTEGER NOT NULL REFERENCES accounts (account_id),
    from_account_id INTEGER REFERENCES accounts (account_id),
    to_account_id   INTEGER REFERENCES accounts (account_id),
    amount          INTEGER NOT NULL CHECK (amount > 0),
    occurred_at     TEXT    NOT NULL,
    CHECK ((from_account_id IS NULL) = (to_account_id IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_ledger_account ON ledger_entries (account_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_ledger_from ON ledger_entries (from_account_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_ledger_to ON ledger_entries (to_account_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_ledger_occurred_at ON ledger_entries (occurred_at);

CREATE TRIGGER IF NOT EXISTS ledger_entries_no_update
BEFORE UPDATE ON ledger_entries
BEGIN
    SELECT RAISE(ABORT, 'ledger entries are immutable');
END;

CREATE TRIGGER IF NOT EXISTS ledger_entries_no_delete
BEFORE DELETE ON ledger_entries
BEGIN
    SELECT RAISE(ABORT, 'ledger entries are immutable');
END;
";

/// Handle to the durable store.
///
/// Cheap to clone; every operation opens its own connection, so clones can be
/// moved onto independent worker threads.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    lock_timeout: Duration,
}

impl Database {
    /// Open (and if needed create) the database described by `config`.
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let db = Self {
            path: config.database_path.clone(),
            lock_timeout: config.lock_timeout,
        };
        let conn = db.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            log::warn!("Journal mode is {mode}, readers may block on writers");
        }
        conn.execute_batch(SCHEMA)?;
        log::debug!("Database ready at {}", db.path.display());
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh connection. Waits for locks at most the configured lock timeout.
    pub(crate) fn connect(&self) -> Result<Connection, LedgerError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.lock_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(conn)
    }

    /// Run `work` as one atomic unit.
    ///
    /// The storage write lock is taken before `work` runs. The unit commits only
    /// when `work` returns `Ok`; any error rolls back every effect of the unit.
    pub fn unit_of_work<T, F>(&self, operation: &'static str, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T, LedgerError>,
    {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| report(operation, OperationStage::Validated, err.into()))?;

        let mut uow = UnitOfWork {
            operation,
            stage: OperationStage::Validated,
            tx,
        };

        match work(&mut uow) {
            Ok(value) => {
                let stage = uow.stage;
                uow.tx
                    .commit()
                    .map_err(|err| report(operation, stage, err.into()))?;
                log::debug!("[{operation}] {stage} -> {}", OperationStage::Committed);
                Ok(value)
            }
            Err(err) => {
                let stage = uow.stage;
                if let Err(rollback) = uow.tx.rollback() {
                    log::error!("[{operation}] rollback failed: {rollback}");
                }
                Err(report(operation, stage, err))
            }
        }
    }
}

fn report(operation: &'static str, stage: OperationStage, err: LedgerError) -> LedgerError {
    match &err {
        LedgerError::Storage(source) => {
            log::error!("[{operation}] {stage} -> {}: {source}", OperationStage::RolledBack);
        }
        LedgerError::Conflict(source) => {
            log::warn!("[{operation}] {stage} -> {}: {source}", OperationStage::RolledBack);
        }
        _ => log::debug!("[{operation}] {stage} -> {}: {err}", OperationStage::RolledBack),
    }
    err
}

/// Where an operation is on its way to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationStage {
    Initiated,
    Validated,
    Locked,
    Mutated,
    Recorded,
    Committed,
    RolledBack,
}

impl std::fmt::Display for OperationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStage::Initiated => write!(f, "initiated"),
            OperationStage::Validated => write!(f, "validated"),
            OperationStage::Locked => write!(f, "locked"),
            OperationStage::Mutated => write!(f, "mutated"),
            OperationStage::Recorded => write!(f, "recorded"),
            OperationStage::Committed => write!(f, "committed"),
            OperationStage::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// An open storage transaction holding the write lock.
pub struct UnitOfWork<'conn> {
    operation: &'static str,
    stage: OperationStage,
    tx: Transaction<'conn>,
}

impl UnitOfWork<'_> {
    pub(crate) fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn stage(&self) -> OperationStage {
        self.stage
    }

    pub fn advance(&mut self, next: OperationStage) {
        debug_assert!(next > self.stage, "stage {next} does not follow {}", self.stage);
        log::trace!("[{}] {} -> {next}", self.operation, self.stage);
        self.stage = next;
    }
}

/// Fixed-width RFC 3339 so that text order equals time order.
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}
