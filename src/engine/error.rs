use rusqlite::ErrorCode;

use crate::engine::account::AccountId;
use crate::engine::operation::OperationRecord;

/// Top-level error type for batch processing and exports.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors during `OperationRecord` -> `Operation` conversion (hard errors).
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(OperationRecord),
}

/// The coarse failure kinds callers map to distinct responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Conflict,
    InternalStorage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation_error"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::InsufficientFunds => write!(f, "insufficient_funds"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::InternalStorage => write!(f, "internal_error"),
        }
    }
}

/// Failures of ledger operations and queries.
///
/// Storage failures keep their source for logging but never render it in
/// `Display`, so the message is safe to hand back to a caller.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Cannot transfer from account {account} to itself")]
    SameAccount { account: AccountId },

    #[error("Account name must not be empty")]
    EmptyAccountName,

    #[error("Invalid {field} format: {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("Date range is inverted: {start} is after {end}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Balance of account {account} would overflow")]
    BalanceOverflow { account: AccountId },

    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    #[error("Insufficient funds: account {account} has {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: i64,
        requested: i64,
    },

    #[error("Account is busy, retry the operation")]
    Conflict(#[source] rusqlite::Error),

    #[error("Internal storage error")]
    Storage(#[source] rusqlite::Error),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::SameAccount { .. }
            | LedgerError::EmptyAccountName
            | LedgerError::InvalidDate { .. }
            | LedgerError::InvertedDateRange { .. }
            | LedgerError::BalanceOverflow { .. } => ErrorKind::Validation,
            LedgerError::AccountNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Storage(_) => ErrorKind::InternalStorage,
        }
    }

    /// Only contention is safe to resubmit unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => LedgerError::Conflict(err),
            _ => LedgerError::Storage(err),
        }
    }
}
