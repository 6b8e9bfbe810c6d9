mod top_up;
mod transfer;

pub use top_up::TopUp;
pub use transfer::Transfer;

use serde::Deserialize;

use super::account::AccountId;
use super::error::RecordError;
use super::ledger::CategoryId;

/// Raw operation record as parsed from CSV input.
/// This is the unvalidated form that needs conversion to a specific `Operation`.
#[derive(Debug, Deserialize, Clone)]
pub struct OperationRecord {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Account credited by a top-up, or debited by a transfer
    pub account: AccountId,
    /// Destination account: required for Transfer, must be None for `TopUp`
    pub to: Option<AccountId>,
    pub amount: i64,
    /// Optional category, only meaningful for `TopUp`
    pub category: Option<CategoryId>,
}

impl std::fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to {
            Some(to) => write!(
                f,
                "{} (account: {}, to: {}, amount: {})",
                self.op_type, self.account, to, self.amount
            ),
            None => write!(
                f,
                "{} (account: {}, amount: {})",
                self.op_type, self.account, self.amount
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    TopUp,
    Transfer,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::TopUp => write!(f, "topup"),
            OperationType::Transfer => write!(f, "transfer"),
        }
    }
}

/// A validated operation ready for the transfer engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    TopUp(TopUp),
    Transfer(Transfer),
}

impl TryFrom<OperationRecord> for Operation {
    type Error = RecordError;

    fn try_from(record: OperationRecord) -> Result<Self, Self::Error> {
        match record.op_type {
            OperationType::TopUp => Ok(Operation::TopUp(TopUp::try_from(record)?)),
            OperationType::Transfer => Ok(Operation::Transfer(Transfer::try_from(record)?)),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::TopUp(t) => {
                write!(f, "[topup] account={} amount={}", t.account_id(), t.amount())
            }
            Operation::Transfer(t) => {
                write!(
                    f,
                    "[transfer] from={} to={} amount={}",
                    t.from_account_id(),
                    t.to_account_id(),
                    t.amount()
                )
            }
        }
    }
}
