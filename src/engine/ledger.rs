use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::error::LedgerError;
use super::storage::{decode_timestamp, encode_timestamp, Database, UnitOfWork};
use crate::config::DEFAULT_MUTATION_LIMIT;

pub type EntryId = i64;
pub type CategoryId = i64;

/// An immutable record of one balance-affecting event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    #[serde(rename = "transaction_id")]
    entry_id: EntryId,
    #[serde(rename = "transaction_category_id")]
    category_id: Option<CategoryId>,
    account_id: AccountId,
    from_account_id: Option<AccountId>,
    to_account_id: Option<AccountId>,
    amount: i64,
    #[serde(rename = "transaction_date")]
    occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    /// The account this entry is filed under
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn from_account_id(&self) -> Option<AccountId> {
        self.from_account_id
    }

    pub fn to_account_id(&self) -> Option<AccountId> {
        self.to_account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Whether this entry records a transfer rather than a top-up
    pub fn is_transfer(&self) -> bool {
        self.from_account_id.is_some()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: String = row.get(6)?;
        let occurred_at = decode_timestamp(&raw)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(err)))?;
        Ok(Self {
            entry_id: row.get(0)?,
            category_id: row.get(1)?,
            account_id: row.get(2)?,
            from_account_id: row.get(3)?,
            to_account_id: row.get(4)?,
            amount: row.get(5)?,
            occurred_at,
        })
    }
}

/// An entry waiting to be appended. Amount validation happens upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    account_id: AccountId,
    counterparties: Option<(AccountId, AccountId)>,
    category_id: Option<CategoryId>,
    amount: i64,
}

impl NewEntry {
    pub fn top_up(account_id: AccountId, amount: i64, category_id: Option<CategoryId>) -> Self {
        Self {
            account_id,
            counterparties: None,
            category_id,
            amount,
        }
    }

    /// A transfer is filed under its source account.
    pub fn transfer(from: AccountId, to: AccountId, amount: i64) -> Self {
        Self {
            account_id: from,
            counterparties: Some((from, to)),
            category_id: None,
            amount,
        }
    }
}

/// Which entries to list for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    account_id: AccountId,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: usize,
}

impl EntryQuery {
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id,
            since: None,
            until: None,
            limit: DEFAULT_MUTATION_LIMIT,
        }
    }

    /// Only entries at or after `since`
    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Only entries at or before `until`
    #[must_use]
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Append-only history of balance-affecting events.
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    db: Database,
}

impl TransactionLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist `entry` inside the caller's unit of work.
    ///
    /// The timestamp is taken here, under the write lock, and never precedes the
    /// newest recorded entry, so commit order and time order agree.
    pub fn append(&self, uow: &UnitOfWork<'_>, entry: NewEntry) -> Result<LedgerEntry, LedgerError> {
        let conn = uow.conn();

        let newest: Option<String> = conn
            .query_row("SELECT MAX(occurred_at) FROM ledger_entries", [], |row| row.get(0))
            .optional()?
            .flatten();
        let mut occurred_at = encode_timestamp(Utc::now());
        if let Some(newest) = newest {
            if newest > occurred_at {
                log::debug!("Clock is behind newest entry ({newest}), reusing its timestamp");
                occurred_at = newest;
            }
        }

        let (from, to) = entry.counterparties.unzip();
        conn.execute(
            "INSERT INTO ledger_entries
                (category_id, account_id, from_account_id, to_account_id, amount, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![entry.category_id, entry.account_id, from, to, entry.amount, occurred_at],
        )?;
        let entry_id = conn.last_insert_rowid();

        let recorded = conn.query_row(
            "SELECT entry_id, category_id, account_id, from_account_id, to_account_id, amount, occurred_at
             FROM ledger_entries WHERE entry_id = ?1",
            params![entry_id],
            LedgerEntry::from_row,
        )?;

        log::trace!(
            "[append] entry={} account={} amount={} at {}",
            recorded.entry_id,
            recorded.account_id,
            recorded.amount,
            recorded.occurred_at
        );
        Ok(recorded)
    }

    /// Entries that touch the account as owner, source or destination, newest
    /// first (ties by entry ID), read as one snapshot.
    pub fn list(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, LedgerError> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id, category_id, account_id, from_account_id, to_account_id, amount, occurred_at
             FROM ledger_entries
             WHERE (account_id = ?1 OR from_account_id = ?1 OR to_account_id = ?1)
               AND (?2 IS NULL OR occurred_at >= ?2)
               AND (?3 IS NULL OR occurred_at <= ?3)
             ORDER BY occurred_at DESC, entry_id DESC
             LIMIT ?4",
        )?;

        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(
                params![
                    query.account_id,
                    query.since.map(encode_timestamp),
                    query.until.map(encode_timestamp),
                    limit
                ],
                LedgerEntry::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        log::trace!(
            "[list] account={} -> {} entries",
            query.account_id,
            entries.len()
        );
        Ok(entries)
    }
}
