use std::io::Read;

use super::account::{AccountId, AccountStore};
use super::error::{Error, LedgerError};
use super::ledger::{CategoryId, LedgerEntry, NewEntry, TransactionLedger};
use super::operation::{Operation, OperationRecord, TopUp, Transfer};
use super::storage::{Database, OperationStage};

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: u64,
    pub skipped: u64,
}

/// The core balance mutation engine.
///
/// Every top-up and transfer runs as its own unit of work: the balance change
/// and its ledger entry commit together or not at all.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    db: Database,
    accounts: AccountStore,
    ledger: TransactionLedger,
}

impl TransferEngine {
    pub fn new(db: Database) -> Self {
        log::trace!("TransferEngine initialized on {}", db.path().display());
        Self {
            accounts: AccountStore::new(db.clone()),
            ledger: TransactionLedger::new(db.clone()),
            db,
        }
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Credit `account_id` with `amount` minor units.
    pub fn top_up(&self, account_id: AccountId, amount: i64) -> Result<LedgerEntry, LedgerError> {
        log::trace!("[top_up] {} account={account_id} amount={amount}", OperationStage::Initiated);
        self.apply_top_up(TopUp::new(account_id, amount)?)
    }

    /// Like [`TransferEngine::top_up`], filing the entry under a category.
    pub fn top_up_with_category(
        &self,
        account_id: AccountId,
        amount: i64,
        category_id: CategoryId,
    ) -> Result<LedgerEntry, LedgerError> {
        log::trace!(
            "[top_up] {} account={account_id} amount={amount} category={category_id}",
            OperationStage::Initiated
        );
        self.apply_top_up(TopUp::new(account_id, amount)?.with_category(category_id))
    }

    /// Move `amount` minor units from `from` to `to`.
    pub fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> Result<LedgerEntry, LedgerError> {
        log::trace!("[transfer] {} from={from} to={to} amount={amount}", OperationStage::Initiated);
        self.apply_transfer(Transfer::new(from, to, amount)?)
    }

    /// Apply an already validated operation.
    pub fn apply(&self, operation: Operation) -> Result<LedgerEntry, LedgerError> {
        log::trace!("Applying operation: {operation}");
        match operation {
            Operation::TopUp(top_up) => self.apply_top_up(top_up),
            Operation::Transfer(transfer) => self.apply_transfer(transfer),
        }
    }

    /// Apply operations from any CSV source (File, `TcpStream`, etc.)
    ///
    /// Rows failing with ledger errors are logged and skipped; malformed rows stop
    /// the batch. Each applied row is its own unit of work.
    pub fn process_operations<R: Read>(&self, reader: R) -> Result<BatchSummary, Error> {
        log::info!("Starting operation processing");

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut summary = BatchSummary::default();
        for result in csv_reader.deserialize() {
            let record: OperationRecord = result?;
            let row_num = summary.applied + summary.skipped + 1;
            log::trace!("[row {row_num}] Parsing: {record}");

            let operation = Operation::try_from(record)?;

            match self.apply(operation) {
                Ok(entry) => {
                    log::trace!("[row {row_num}] Recorded entry {}", entry.entry_id());
                    summary.applied += 1;
                }
                Err(e) => {
                    log::warn!("[row {row_num}] - Skipped ({}): {e}", e.kind());
                    summary.skipped += 1;
                }
            }
        }

        log::info!(
            "Processing complete: {} applied, {} skipped",
            summary.applied,
            summary.skipped
        );
        Ok(summary)
    }
}

// =============================================================================
// Operation Handlers
// =============================================================================

impl TransferEngine {
    fn apply_top_up(&self, top_up: TopUp) -> Result<LedgerEntry, LedgerError> {
        let account_id = top_up.account_id();
        let amount = top_up.amount();
        log::trace!("[top_up] {} account={account_id} amount={amount}", OperationStage::Validated);

        self.db.unit_of_work("top_up", |uow| {
            self.accounts.lock_in_order(uow, &[account_id])?;
            uow.advance(OperationStage::Locked);

            let balance = self.accounts.adjust_balance(uow, account_id, amount)?;
            uow.advance(OperationStage::Mutated);

            let entry = self.ledger.append(
                uow,
                NewEntry::top_up(account_id, amount, top_up.category_id()),
            )?;
            uow.advance(OperationStage::Recorded);

            log::debug!(
                "[top_up] account={account_id} amount={amount} -> balance={balance} entry={}",
                entry.entry_id()
            );
            Ok(entry)
        })
    }

    fn apply_transfer(&self, transfer: Transfer) -> Result<LedgerEntry, LedgerError> {
        let from = transfer.from_account_id();
        let to = transfer.to_account_id();
        let amount = transfer.amount();
        log::trace!("[transfer] {} from={from} to={to} amount={amount}", OperationStage::Validated);

        self.db.unit_of_work("transfer", |uow| {
            let balances = self.accounts.lock_in_order(uow, &transfer.lock_order())?;
            uow.advance(OperationStage::Locked);

            let available = if transfer.lock_order()[0] == from {
                balances[0]
            } else {
                balances[1]
            };
            if available < amount {
                return Err(LedgerError::InsufficientFunds {
                    account: from,
                    available,
                    requested: amount,
                });
            }

            let from_balance = self.accounts.adjust_balance(uow, from, -amount)?;
            let to_balance = self.accounts.adjust_balance(uow, to, amount)?;
            uow.advance(OperationStage::Mutated);

            let entry = self.ledger.append(uow, NewEntry::transfer(from, to, amount))?;
            uow.advance(OperationStage::Recorded);

            log::debug!(
                "[transfer] from={from} to={to} amount={amount} -> balances={from_balance}/{to_balance} entry={}",
                entry.entry_id()
            );
            Ok(entry)
        })
    }
}
