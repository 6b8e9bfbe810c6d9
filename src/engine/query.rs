use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta};

use super::account::{AccountId, AccountStore};
use super::error::LedgerError;
use super::ledger::{EntryQuery, LedgerEntry, TransactionLedger};
use super::storage::Database;
use crate::config::DEFAULT_MUTATION_LIMIT;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read-only view of committed balances.
#[derive(Debug, Clone)]
pub struct BalanceQuery {
    accounts: AccountStore,
}

impl BalanceQuery {
    pub fn new(db: Database) -> Self {
        Self {
            accounts: AccountStore::new(db),
        }
    }

    pub fn balance(&self, account_id: AccountId) -> Result<i64, LedgerError> {
        self.accounts.get_balance(account_id)
    }
}

/// Recent ledger history of one account.
#[derive(Debug, Clone)]
pub struct MutationQuery {
    ledger: TransactionLedger,
    limit: usize,
}

impl MutationQuery {
    pub fn new(db: Database) -> Self {
        Self {
            ledger: TransactionLedger::new(db),
            limit: DEFAULT_MUTATION_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Entries for `account_id`, newest first, optionally bounded by
    /// `YYYY-MM-DD` dates. Both bounds are inclusive whole days (UTC).
    pub fn mutation(
        &self,
        account_id: AccountId,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let start = start_date
            .map(|raw| parse_date("start_date", raw))
            .transpose()?;
        let end = end_date.map(|raw| parse_date("end_date", raw)).transpose()?;
        self.mutation_between(account_id, start, end)
    }

    /// Like [`MutationQuery::mutation`] with already parsed dates. Years must
    /// lie in 0000..=9999.
    pub fn mutation_between(
        &self,
        account_id: AccountId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let start = start.map(|date| check_year("start_date", date)).transpose()?;
        let end = end.map(|date| check_year("end_date", date)).transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(LedgerError::InvertedDateRange { start, end });
            }
        }

        let mut query = EntryQuery::for_account(account_id).limit(self.limit);
        if let Some(start) = start {
            query = query.since(start.and_time(NaiveTime::MIN).and_utc());
        }
        if let Some(end) = end {
            // last representable microsecond of the end day
            let end_of_day = end
                .and_time(NaiveTime::MIN)
                .and_utc()
                .checked_add_signed(TimeDelta::days(1))
                .and_then(|next_day| next_day.checked_sub_signed(TimeDelta::microseconds(1)))
                .ok_or_else(|| LedgerError::InvalidDate {
                    field: "end_date",
                    value: end.to_string(),
                })?;
            query = query.until(end_of_day);
        }

        self.ledger.list(&query)
    }
}

/// Strict `YYYY-MM-DD`. Signed or wider years would not compare correctly
/// against stored timestamps, so they are rejected here.
fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, LedgerError> {
    let invalid = || LedgerError::InvalidDate {
        field,
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let well_formed = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())
}

fn check_year(field: &'static str, date: NaiveDate) -> Result<NaiveDate, LedgerError> {
    if (0..=9999).contains(&date.year()) {
        Ok(date)
    } else {
        Err(LedgerError::InvalidDate {
            field,
            value: date.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;
    use crate::engine::storage::test_support::scratch_database;
    use crate::engine::TransferEngine;

    #[test]
    fn test_balance_is_pure() {
        let (db, _dir) = scratch_database();
        let engine = TransferEngine::new(db.clone());
        let id = engine.accounts().create("alice").unwrap().account_id();
        engine.top_up(id, 250).unwrap();

        let query = BalanceQuery::new(db);
        assert_eq!(query.balance(id).unwrap(), 250);
        assert_eq!(query.balance(id).unwrap(), 250);
        assert_eq!(query.balance(id + 1).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rejects_bad_date_format() {
        let (db, _dir) = scratch_database();
        let query = MutationQuery::new(db);

        let err = query.mutation(1, Some("2024/01/01"), None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidDate {
                field: "start_date",
                ..
            }
        ));
        let err = query.mutation(1, None, Some("yesterday")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_rejects_years_outside_four_digits() {
        let (db, _dir) = scratch_database();
        let query = MutationQuery::new(db);

        let err = query.mutation(1, None, Some("+262142-12-31")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = query.mutation(1, Some("+10000-01-01"), None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidDate {
                field: "start_date",
                ..
            }
        ));
        let err = query.mutation(1, Some("24-1-1"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = query
            .mutation_between(1, None, Some(NaiveDate::MAX))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidDate {
                field: "end_date",
                ..
            }
        ));
    }

    #[test]
    fn test_last_four_digit_day_is_accepted() {
        let (db, _dir) = scratch_database();
        let engine = TransferEngine::new(db.clone());
        let id = engine.accounts().create("alice").unwrap().account_id();
        engine.top_up(id, 10).unwrap();

        let query = MutationQuery::new(db);
        assert_eq!(query.mutation(id, None, Some("9999-12-31")).unwrap().len(), 1);
        assert!(query
            .mutation(id, Some("9999-12-31"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let (db, _dir) = scratch_database();
        let query = MutationQuery::new(db);
        let err = query
            .mutation(1, Some("2024-02-01"), Some("2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvertedDateRange { .. }));
    }

    #[test]
    fn test_end_date_includes_the_whole_day() {
        let (db, _dir) = scratch_database();
        let engine = TransferEngine::new(db.clone());
        let id = engine.accounts().create("alice").unwrap().account_id();
        let entry = engine.top_up(id, 10).unwrap();

        let today = entry.occurred_at().date_naive();
        let query = MutationQuery::new(db);

        let same_day = query.mutation_between(id, Some(today), Some(today)).unwrap();
        assert_eq!(same_day.len(), 1);

        let before = query
            .mutation_between(id, None, Some(today - TimeDelta::days(1)))
            .unwrap();
        assert!(before.is_empty());

        let after = query
            .mutation_between(id, Some(today + TimeDelta::days(1)), None)
            .unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn test_unknown_account_has_empty_history() {
        let (db, _dir) = scratch_database();
        let query = MutationQuery::new(db);
        assert!(query.mutation(404, None, None).unwrap().is_empty());
    }
}
