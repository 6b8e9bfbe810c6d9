//! Account balances with atomic top-ups and transfers, recorded in an
//! append-only ledger backed by SQLite.

pub mod auth;
pub mod config;
pub mod engine;

pub use auth::{AuthError, AuthTokenValidator, Claims, JwtValidator};
pub use config::LedgerConfig;
pub use engine::{
    Account, AccountId, BalanceQuery, Database, Error, ErrorKind, LedgerEntry, LedgerError,
    MutationQuery, TransferEngine,
};
