use std::io::Write;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::error::{Error, LedgerError};
use super::storage::{Database, UnitOfWork};

pub type AccountId = i64;

/// An account holder's balance in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    account_id: AccountId,
    name: String,
    balance: i64,
}

impl Account {
    /// Returns the account ID
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the holder's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the committed balance at the time the account was read
    pub fn balance(&self) -> i64 {
        self.balance
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account_id: row.get(0)?,
            name: row.get(1)?,
            balance: row.get(2)?,
        })
    }
}

/// Owns account balances.
///
/// Reads outside a unit of work see the last committed state. Mutations only
/// happen through a [`UnitOfWork`] so they share the caller's transaction.
#[derive(Debug, Clone)]
pub struct AccountStore {
    db: Database,
}

impl AccountStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open a new account with a zero balance.
    pub fn create(&self, name: &str) -> Result<Account, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyAccountName);
        }

        let account = self.db.unit_of_work("open_account", |uow| {
            let conn = uow.conn();
            conn.execute("INSERT INTO accounts (name) VALUES (?1)", params![name])?;
            Ok(Account {
                account_id: conn.last_insert_rowid(),
                name: name.to_string(),
                balance: 0,
            })
        })?;

        log::debug!("Opened account {} ({})", account.account_id, account.name);
        Ok(account)
    }

    pub fn get(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        let conn = self.db.connect()?;
        conn.query_row(
            "SELECT account_id, name, balance FROM accounts WHERE account_id = ?1",
            params![account_id],
            Account::from_row,
        )
        .optional()?
        .ok_or(LedgerError::AccountNotFound {
            account: account_id,
        })
    }

    /// All accounts ordered by ID.
    pub fn list(&self) -> Result<Vec<Account>, LedgerError> {
        let conn = self.db.connect()?;
        let mut stmt =
            conn.prepare("SELECT account_id, name, balance FROM accounts ORDER BY account_id")?;
        let accounts = stmt
            .query_map([], Account::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    /// Committed balance of `account_id`.
    pub fn get_balance(&self, account_id: AccountId) -> Result<i64, LedgerError> {
        let conn = self.db.connect()?;
        read_balance(&conn, account_id)
    }

    /// Take exclusive access to `account_ids` in ascending ID order and return
    /// their balances in the order the IDs were given.
    ///
    /// The unit of work already holds the storage write lock, which covers every
    /// row; visiting rows in canonical order keeps the acquisition order total
    /// for any two operations that touch the same accounts.
    pub fn lock_in_order(
        &self,
        uow: &UnitOfWork<'_>,
        account_ids: &[AccountId],
    ) -> Result<Vec<i64>, LedgerError> {
        let mut ordered = account_ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut locked = Vec::with_capacity(ordered.len());
        for account_id in ordered {
            let balance = read_balance(uow.conn(), account_id)?;
            log::trace!("Locked account {account_id} (balance {balance})");
            locked.push((account_id, balance));
        }

        Ok(account_ids
            .iter()
            .map(|id| {
                locked
                    .iter()
                    .find(|(locked_id, _)| locked_id == id)
                    .map_or(0, |(_, balance)| *balance)
            })
            .collect())
    }

    /// Apply a signed `delta` to the persisted balance.
    ///
    /// Fails with `InsufficientFunds` if the result would be negative; the
    /// balance is left untouched in that case.
    pub fn adjust_balance(
        &self,
        uow: &UnitOfWork<'_>,
        account_id: AccountId,
        delta: i64,
    ) -> Result<i64, LedgerError> {
        let conn = uow.conn();
        let current = read_balance(conn, account_id)?;
        let updated = current
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow {
                account: account_id,
            })?;

        if updated < 0 {
            return Err(LedgerError::InsufficientFunds {
                account: account_id,
                available: current,
                requested: delta.saturating_neg(),
            });
        }

        conn.execute(
            "UPDATE accounts SET balance = ?2 WHERE account_id = ?1",
            params![account_id, updated],
        )?;

        log::trace!("[adjust] account={account_id} delta={delta} -> balance={updated}");
        Ok(updated)
    }

    /// Write all accounts as CSV to any sink (Stdout, File, `TcpStream`, etc.)
    pub fn export_accounts<W: Write>(&self, writer: W) -> Result<usize, Error> {
        let accounts = self.list()?;
        log::info!("Exporting {} accounts", accounts.len());

        let mut csv_writer = csv::Writer::from_writer(writer);
        for account in &accounts {
            csv_writer.serialize(account)?;
        }
        csv_writer.flush()?;

        Ok(accounts.len())
    }
}

fn read_balance(conn: &Connection, account_id: AccountId) -> Result<i64, LedgerError> {
    conn.query_row(
        "SELECT balance FROM accounts WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(LedgerError::AccountNotFound {
        account: account_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::storage::test_support::scratch_database;

    fn store_with(balances: &[i64]) -> (AccountStore, Vec<AccountId>, tempfile::TempDir) {
        let (db, dir) = scratch_database();
        let store = AccountStore::new(db.clone());
        let ids = balances
            .iter()
            .enumerate()
            .map(|(i, &balance)| {
                let account = store.create(&format!("holder-{i}")).unwrap();
                if balance > 0 {
                    db.unit_of_work("seed", |uow| store.adjust_balance(uow, account.account_id(), balance))
                        .unwrap();
                }
                account.account_id()
            })
            .collect();
        (store, ids, dir)
    }

    #[test]
    fn test_new_account_has_zero_balance() {
        let (store, ids, _dir) = store_with(&[0]);
        let account = store.get(ids[0]).unwrap();
        assert_eq!(account.balance(), 0);
        assert_eq!(account.name(), "holder-0");
    }

    #[test]
    fn test_rejects_blank_name() {
        let (db, _dir) = scratch_database();
        let store = AccountStore::new(db);
        assert!(matches!(
            store.create("   "),
            Err(LedgerError::EmptyAccountName)
        ));
    }

    #[test]
    fn test_unknown_account_is_not_found() {
        let (store, _ids, _dir) = store_with(&[]);
        assert!(matches!(
            store.get_balance(42),
            Err(LedgerError::AccountNotFound { account: 42 })
        ));
    }

    #[test]
    fn test_adjust_balance_credits_and_debits() {
        let (store, ids, _dir) = store_with(&[100]);
        let db = store.db.clone();

        let balance = db
            .unit_of_work("test", |uow| store.adjust_balance(uow, ids[0], -40))
            .unwrap();
        assert_eq!(balance, 60);
        assert_eq!(store.get_balance(ids[0]).unwrap(), 60);
    }

    #[test]
    fn test_adjust_balance_refuses_to_go_negative() {
        let (store, ids, _dir) = store_with(&[50]);
        let db = store.db.clone();

        let result = db.unit_of_work("test", |uow| store.adjust_balance(uow, ids[0], -51));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                available: 50,
                requested: 51,
                ..
            })
        ));
        assert_eq!(store.get_balance(ids[0]).unwrap(), 50);
    }

    #[test]
    fn test_adjust_balance_rejects_overflow() {
        let (store, ids, _dir) = store_with(&[1]);
        let db = store.db.clone();

        let result = db.unit_of_work("test", |uow| store.adjust_balance(uow, ids[0], i64::MAX));
        assert!(matches!(result, Err(LedgerError::BalanceOverflow { .. })));
        assert_eq!(store.get_balance(ids[0]).unwrap(), 1);
    }

    #[test]
    fn test_lock_in_order_returns_balances_in_request_order() {
        let (store, ids, _dir) = store_with(&[10, 20]);
        let db = store.db.clone();

        let balances = db
            .unit_of_work("test", |uow| store.lock_in_order(uow, &[ids[1], ids[0]]))
            .unwrap();
        assert_eq!(balances, vec![20, 10]);
    }

    #[test]
    fn test_lock_in_order_reports_missing_account() {
        let (store, ids, _dir) = store_with(&[10]);
        let db = store.db.clone();

        let result = db.unit_of_work("test", |uow| store.lock_in_order(uow, &[ids[0], 999]));
        assert!(matches!(
            result,
            Err(LedgerError::AccountNotFound { account: 999 })
        ));
    }

    #[test]
    fn test_export_accounts_writes_csv() {
        let (store, _ids, _dir) = store_with(&[100, 0]);
        let mut output = Vec::new();
        let exported = store.export_accounts(&mut output).unwrap();

        assert_eq!(exported, 2);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "account_id,name,balance\n1,holder-0,100\n2,holder-1,0\n"
        );
    }
}
