use crate::engine::{
    account::AccountId,
    error::{LedgerError, RecordError},
    ledger::CategoryId,
    operation::{OperationRecord, OperationType},
};

/// A validated top-up.
///
/// Top-ups credit a single account and are recorded without counterparties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUp {
    account_id: AccountId,
    amount: i64,
    category_id: Option<CategoryId>,
}

impl TopUp {
    pub fn new(account_id: AccountId, amount: i64) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        Ok(Self {
            account_id,
            amount,
            category_id: None,
        })
    }

    #[must_use]
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }
}

impl TryFrom<OperationRecord> for TopUp {
    type Error = RecordError;

    fn try_from(record: OperationRecord) -> Result<Self, Self::Error> {
        match record {
            OperationRecord {
                op_type: OperationType::TopUp,
                account,
                to: None,
                amount,
                category,
            } if amount > 0 => Ok(TopUp {
                account_id: account,
                amount,
                category_id: category,
            }),
            _ => Err(RecordError::InvalidOperation(record)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(amount: i64, to: Option<AccountId>) -> OperationRecord {
        OperationRecord {
            op_type: OperationType::TopUp,
            account: 1,
            to,
            amount,
            category: Some(7),
        }
    }

    #[test]
    fn test_valid_top_up() {
        let top_up = TopUp::try_from(make_record(200, None)).unwrap();

        assert_eq!(top_up.account_id(), 1);
        assert_eq!(top_up.amount(), 200);
        assert_eq!(top_up.category_id(), Some(7));
    }

    #[test]
    fn test_rejects_zero_and_negative_amounts() {
        assert!(TopUp::try_from(make_record(0, None)).is_err());
        assert!(TopUp::try_from(make_record(-5, None)).is_err());
        assert!(matches!(
            TopUp::new(1, 0),
            Err(LedgerError::InvalidAmount { amount: 0 })
        ));
    }

    #[test]
    fn test_rejects_destination_account() {
        assert!(TopUp::try_from(make_record(200, Some(2))).is_err());
    }

    #[test]
    fn test_rejects_wrong_operation_type() {
        let record = OperationRecord {
            op_type: OperationType::Transfer,
            ..make_record(200, None)
        };
        assert!(TopUp::try_from(record).is_err());
    }
}
