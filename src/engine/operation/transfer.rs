use crate::engine::{
    account::AccountId,
    error::{LedgerError, RecordError},
    operation::{OperationRecord, OperationType},
};

/// A validated peer-to-peer transfer.
///
/// Transfers debit the source and credit the destination in one unit of work.
/// If the source does not have sufficient funds, the transfer fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    from_account_id: AccountId,
    to_account_id: AccountId,
    amount: i64,
}

impl Transfer {
    pub fn new(from: AccountId, to: AccountId, amount: i64) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if from == to {
            return Err(LedgerError::SameAccount { account: from });
        }
        Ok(Self {
            from_account_id: from,
            to_account_id: to,
            amount,
        })
    }

    pub fn from_account_id(&self) -> AccountId {
        self.from_account_id
    }

    pub fn to_account_id(&self) -> AccountId {
        self.to_account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Both accounts in the order they must be locked.
    pub fn lock_order(&self) -> [AccountId; 2] {
        let (low, high) = if self.from_account_id < self.to_account_id {
            (self.from_account_id, self.to_account_id)
        } else {
            (self.to_account_id, self.from_account_id)
        };
        [low, high]
    }
}

impl TryFrom<OperationRecord> for Transfer {
    type Error = RecordError;

    fn try_from(record: OperationRecord) -> Result<Self, Self::Error> {
        match record {
            OperationRecord {
                op_type: OperationType::Transfer,
                account,
                to: Some(to),
                amount,
                category: None,
            } if amount > 0 && account != to => Ok(Transfer {
                from_account_id: account,
                to_account_id: to,
                amount,
            }),
            _ => Err(RecordError::InvalidOperation(record)),
        }
    }
}
