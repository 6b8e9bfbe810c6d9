//! Ledger engine module.
//!
//! This module contains the balance mutation core including:
//! - `TransferEngine` - Atomic top-ups and transfers
//! - `AccountStore` - Account balances and their compare-and-adjust
//! - `TransactionLedger` - The append-only entry history
//! - `BalanceQuery` / `MutationQuery` - Read-only views
//! - `Error` types - Validation, lookup, funds, contention and storage failures

mod account;
mod error;
mod ledger;
mod operation;
mod query;
mod storage;
mod transfer_engine;

pub use account::{Account, AccountId, AccountStore};
pub use error::{Error, ErrorKind, LedgerError, RecordError};
pub use ledger::{CategoryId, EntryId, EntryQuery, LedgerEntry, NewEntry, TransactionLedger};
pub use operation::{Operation, OperationRecord, OperationType, TopUp, Transfer};
pub use query::{BalanceQuery, MutationQuery};
pub use storage::{Database, OperationStage, UnitOfWork};
pub use transfer_engine::{BatchSummary, TransferEngine};
