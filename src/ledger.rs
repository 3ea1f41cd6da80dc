//! The in-memory ledger that holds a user's transactions and their running balance.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error,
    transaction::{
        Transaction, TransactionForm, TransactionId, ValidationError, checked_sum, validate,
    },
};

/// An ordered collection of transactions and the sum of their amounts.
///
/// Transactions are kept newest-first by insertion. The cached balance always
/// equals the sum of the amounts of the transactions held.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    balance: Decimal,
    next_id: TransactionId,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger with a zero balance.
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            balance: Decimal::ZERO,
            next_id: 1,
        }
    }

    /// Create a ledger from transactions that were admitted earlier.
    ///
    /// `transactions` should be ordered newest-first. New transactions will be
    /// given IDs after the largest ID in `transactions`.
    ///
    /// # Errors
    ///
    /// Returns [Error::BalanceOverflow] if the amounts add up to more than a
    /// balance can hold.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Result<Self, Error> {
        let balance = checked_sum(
            transactions
                .iter()
                .map(|transaction| transaction.amount.value()),
        )
        .ok_or(Error::BalanceOverflow)?;
        let next_id = transactions
            .iter()
            .map(|transaction| transaction.id)
            .max()
            .map_or(1, |id| id + 1);

        Ok(Self {
            transactions,
            balance,
            next_id,
        })
    }

    /// Validate `form` and, if it passes, add it as the newest transaction.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] with every broken rule if `form` is not a
    /// valid transaction at `now`, or if its amount would push the balance
    /// out of range. The ledger is not modified in that case.
    pub fn add(&mut self, form: &TransactionForm, now: OffsetDateTime) -> Result<Transaction, Error> {
        let new_transaction = validate(form, now)?;
        let balance = self
            .balance
            .checked_add(new_transaction.amount.value())
            .ok_or_else(balance_out_of_range)?;
        let transaction = new_transaction.into_transaction(self.next_id);

        self.next_id += 1;
        self.balance = balance;
        self.transactions.insert(0, transaction.clone());
        self.check_balance();

        Ok(transaction)
    }

    /// Take back the transaction that the last call to [Ledger::add] returned,
    /// including the ID it was given.
    ///
    /// Returns `None` and leaves the ledger untouched if `id` is not the newest
    /// transaction.
    pub(crate) fn undo_add(&mut self, id: TransactionId) -> Option<Transaction> {
        let is_newest = self.transactions.first().is_some_and(|newest| newest.id == id);

        if !is_newest || id + 1 != self.next_id {
            return None;
        }

        let transaction = self.remove(id)?;
        self.next_id = id;

        Some(transaction)
    }

    /// Remove the transaction with `id` and take its amount off the balance.
    ///
    /// Returns `None` and leaves the ledger untouched if there is no such
    /// transaction, or if the remaining amounts add up to more than a balance
    /// can hold.
    pub fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        let index = self.position(id)?;
        let Some(balance) = self
            .balance
            .checked_sub(self.transactions[index].amount.value())
        else {
            tracing::error!("Removing transaction {id} would overflow the balance, keeping it.");
            return None;
        };

        let transaction = self.transactions.remove(index);
        self.balance = balance;
        self.check_balance();

        Some(transaction)
    }

    /// Replace every field of the transaction with `id` with the fields in `form`.
    ///
    /// The transaction keeps its ID and its place in the list.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::NotFound] if there is no transaction with `id`.
    /// - [Error::Validation] if `form` is not a valid transaction at `now`, or
    ///   if the new amount would push the balance out of range.
    ///
    /// The ledger is not modified if an error is returned.
    pub fn replace(
        &mut self,
        id: TransactionId,
        form: &TransactionForm,
        now: OffsetDateTime,
    ) -> Result<Transaction, Error> {
        if self.position(id).is_none() {
            return Err(Error::NotFound);
        }

        let transaction = validate(form, now)?.into_transaction(id);
        self.swap(transaction.clone())
            .ok_or_else(balance_out_of_range)?;

        Ok(transaction)
    }

    /// Put `transaction` in place of the held transaction with the same ID,
    /// skipping validation, and return the one it replaced.
    ///
    /// Returns `None` and leaves the ledger untouched if there is no such
    /// transaction or the new balance would be out of range. Used to restore a
    /// transaction that was admitted earlier.
    pub(crate) fn swap(&mut self, transaction: Transaction) -> Option<Transaction> {
        let index = self.position(transaction.id)?;
        let difference = transaction
            .amount
            .value()
            .checked_sub(self.transactions[index].amount.value())?;
        let balance = self.balance.checked_add(difference)?;

        let previous = std::mem::replace(&mut self.transactions[index], transaction);
        self.balance = balance;
        self.check_balance();

        Some(previous)
    }

    /// The sum of the amounts of all held transactions.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// The transactions, newest first.
    pub fn list(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The transaction with `id`, if it is held.
    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|transaction| transaction.id == id)
    }

    /// The number of held transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the ledger holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn position(&self, id: TransactionId) -> Option<usize> {
        self.transactions
            .iter()
            .position(|transaction| transaction.id == id)
    }

    fn check_balance(&self) {
        debug_assert_eq!(
            Some(self.balance),
            checked_sum(
                self.transactions
                    .iter()
                    .map(|transaction| transaction.amount.value())
            ),
            "cached balance drifted from the sum of the transactions"
        );
    }
}

fn balance_out_of_range() -> Error {
    Error::Validation(ValidationError {
        violations: vec!["Amount is too large for the current balance".to_owned()],
    })
}

#[cfg(test)]
mod ledger_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        transaction::{Amount, Transaction, TransactionForm},
    };

    use super::Ledger;

    fn now() -> OffsetDateTime {
        datetime!(2025-10-16 14:30:00 +05:30)
    }

    fn form(name: &str, amount: &str, occurred_at: OffsetDateTime) -> TransactionForm {
        TransactionForm {
            name: name.to_owned(),
            amount: amount.to_owned(),
            occurred_at: occurred_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap(),
            ..Default::default()
        }
    }

    fn yesterday() -> OffsetDateTime {
        now() - Duration::days(1)
    }

    fn names(ledger: &Ledger) -> Vec<&str> {
        ledger
            .list()
            .iter()
            .map(|transaction| transaction.name.as_str())
            .collect()
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();

        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn add_remove_scenario() {
        let mut ledger = Ledger::new();

        let salary = ledger
            .add(&form("Salary", "+50000", yesterday()), now())
            .unwrap();
        assert_eq!(ledger.balance(), dec!(50000));
        assert_eq!(ledger.len(), 1);

        ledger.add(&form("Rent", "-15000", yesterday()), now()).unwrap();
        assert_eq!(ledger.balance(), dec!(35000));
        assert_eq!(names(&ledger), vec!["Rent", "Salary"]);

        let removed = ledger.remove(salary.id);
        assert_eq!(removed, Some(salary));
        assert_eq!(ledger.balance(), dec!(-15000));
        assert_eq!(names(&ledger), vec!["Rent"]);
    }

    #[test]
    fn balance_tracks_every_mutation() {
        let mut ledger = Ledger::new();
        let amounts = ["+100", "-20.50", "+0.25", "-1000", "+999.99"];
        let mut want = Decimal::ZERO;
        let mut ids = Vec::new();

        for amount in amounts {
            let transaction = ledger.add(&form("Item", amount, yesterday()), now()).unwrap();
            want += transaction.amount.value();
            ids.push(transaction.id);

            assert_eq!(ledger.balance(), want);
        }

        for id in ids.into_iter().step_by(2) {
            let removed = ledger.remove(id).unwrap();
            want -= removed.amount.value();

            assert_eq!(ledger.balance(), want);
        }

        assert_eq!(ledger.balance(), dec!(-1020.50));
    }

    #[test]
    fn ids_are_unique_after_removal() {
        let mut ledger = Ledger::new();

        let first = ledger.add(&form("A", "+1", yesterday()), now()).unwrap();
        ledger.remove(first.id);
        let second = ledger.add(&form("B", "+1", yesterday()), now()).unwrap();

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn add_rejects_missing_name_without_mutation() {
        let mut ledger = Ledger::new();
        ledger.add(&form("Salary", "+10", yesterday()), now()).unwrap();
        let before = ledger.clone();

        let result = ledger.add(&form("", "+10", now()), now());

        match result {
            Err(Error::Validation(error)) => assert!(error.mentions("name")),
            other => panic!("want validation error, got {other:?}"),
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn add_rejects_one_second_in_the_future() {
        let mut ledger = Ledger::new();

        let result = ledger.add(&form("Rent", "-10", now() + Duration::seconds(1)), now());

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn add_accepts_one_second_in_the_past() {
        let mut ledger = Ledger::new();

        let result = ledger.add(&form("Rent", "-10", now() - Duration::seconds(1)), now());

        assert!(result.is_ok());
        assert_eq!(ledger.balance(), dec!(-10));
    }

    #[test]
    fn add_applies_persistence_rules() {
        let mut ledger = Ledger::new();
        let long_name = "x".repeat(101);

        let result = ledger.add(&form(&long_name, "+10", yesterday()), now());

        match result {
            Err(Error::Validation(error)) => {
                assert_eq!(
                    error.violations,
                    vec!["Transaction name cannot exceed 100 characters"]
                )
            }
            other => panic!("want validation error, got {other:?}"),
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn add_rejects_unsigned_amount() {
        let mut ledger = Ledger::new();

        let result = ledger.add(&form("Rent", "50", yesterday()), now());

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn remove_absent_id_is_a_no_op() {
        let mut ledger = Ledger::new();
        ledger.add(&form("Salary", "+10", yesterday()), now()).unwrap();
        let before = ledger.clone();

        assert_eq!(ledger.remove(42), None);
        assert_eq!(ledger, before);
    }

    #[test]
    fn list_is_stable_without_mutation() {
        let mut ledger = Ledger::new();
        ledger.add(&form("A", "+1", yesterday()), now()).unwrap();
        ledger.add(&form("B", "-2", yesterday()), now()).unwrap();

        let first = ledger.list().to_vec();
        let second = ledger.list().to_vec();

        assert_eq!(first, second);
    }

    #[test]
    fn list_is_ordered_by_insertion_not_date() {
        let mut ledger = Ledger::new();
        ledger
            .add(&form("Recent", "+1", now() - Duration::hours(1)), now())
            .unwrap();
        ledger
            .add(&form("Old", "+1", now() - Duration::days(30)), now())
            .unwrap();

        assert_eq!(names(&ledger), vec!["Old", "Recent"]);
    }

    #[test]
    fn replace_adjusts_balance_and_keeps_position() {
        let mut ledger = Ledger::new();
        let groceries = ledger
            .add(&form("Groceries", "-100", yesterday()), now())
            .unwrap();
        ledger.add(&form("Salary", "+500", yesterday()), now()).unwrap();

        let replaced = ledger
            .replace(groceries.id, &form("Groceries", "-80", yesterday()), now())
            .unwrap();

        assert_eq!(replaced.id, groceries.id);
        assert_eq!(replaced.amount, Amount::new(dec!(-80)));
        assert_eq!(ledger.balance(), dec!(420));
        assert_eq!(names(&ledger), vec!["Salary", "Groceries"]);
        assert_eq!(ledger.get(groceries.id), Some(&replaced));
    }

    #[test]
    fn replace_absent_id_returns_not_found() {
        let mut ledger = Ledger::new();

        let result = ledger.replace(7, &form("Rent", "-10", yesterday()), now());

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn replace_with_invalid_form_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new();
        let rent = ledger.add(&form("Rent", "-10", yesterday()), now()).unwrap();
        let before = ledger.clone();

        let result = ledger.replace(rent.id, &form("Rent", "+0", yesterday()), now());

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(ledger, before);
    }

    fn stored(id: i64, amount: Decimal) -> Transaction {
        Transaction {
            id,
            name: "Stored".to_owned(),
            description: String::new(),
            category: None,
            amount: Amount::new(amount),
            occurred_at: yesterday(),
        }
    }

    #[test]
    fn add_rejects_amount_that_overflows_balance() {
        let mut ledger = Ledger::from_transactions(vec![stored(1, Decimal::MAX)]).unwrap();
        let before = ledger.clone();

        let result = ledger.add(&form("Bonus", "+1", yesterday()), now());

        match result {
            Err(Error::Validation(error)) => assert!(error.mentions("too large")),
            other => panic!("want validation error, got {other:?}"),
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn replace_rejects_amount_that_overflows_balance() {
        let mut ledger =
            Ledger::from_transactions(vec![stored(2, dec!(-10)), stored(1, Decimal::MAX)])
                .unwrap();
        let before = ledger.clone();

        let result = ledger.replace(2, &form("Refund", "+10", yesterday()), now());

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(ledger, before);
    }

    #[test]
    fn remove_keeps_transaction_when_balance_would_overflow() {
        let mut ledger = Ledger::from_transactions(vec![
            stored(3, Decimal::MAX),
            stored(2, Decimal::MIN),
            stored(1, Decimal::MAX),
        ])
        .unwrap();
        let before = ledger.clone();

        assert_eq!(ledger.remove(2), None);
        assert_eq!(ledger, before);
    }

    #[test]
    fn from_transactions_rejects_overflowing_total() {
        let result = Ledger::from_transactions(vec![stored(2, Decimal::MAX), stored(1, dec!(1))]);

        assert_eq!(result, Err(Error::BalanceOverflow));
    }

    #[test]
    fn undo_add_restores_the_id() {
        let mut ledger = Ledger::new();
        ledger.add(&form("Salary", "+10", yesterday()), now()).unwrap();
        let before = ledger.clone();

        let rent = ledger.add(&form("Rent", "-5", yesterday()), now()).unwrap();
        assert_eq!(ledger.undo_add(rent.id), Some(rent));

        assert_eq!(ledger, before);
    }

    #[test]
    fn undo_add_ignores_older_transactions() {
        let mut ledger = Ledger::new();
        let salary = ledger.add(&form("Salary", "+10", yesterday()), now()).unwrap();
        ledger.add(&form("Rent", "-5", yesterday()), now()).unwrap();
        let before = ledger.clone();

        assert_eq!(ledger.undo_add(salary.id), None);
        assert_eq!(ledger, before);
    }

    #[test]
    fn from_transactions_sums_balance_and_continues_ids() {
        let transactions = vec![
            Transaction {
                id: 5,
                name: "Rent".to_owned(),
                description: String::new(),
                category: Some("Housing".to_owned()),
                amount: Amount::new(dec!(-15000)),
                occurred_at: yesterday(),
            },
            Transaction {
                id: 2,
                name: "Salary".to_owned(),
                description: String::new(),
                category: None,
                amount: Amount::new(dec!(50000)),
                occurred_at: yesterday(),
            },
        ];

        let mut ledger = Ledger::from_transactions(transactions).unwrap();
        assert_eq!(ledger.balance(), dec!(35000));
        assert_eq!(names(&ledger), vec!["Rent", "Salary"]);

        let added = ledger.add(&form("Coffee", "-4.50", yesterday()), now()).unwrap();
        assert_eq!(added.id, 6);
    }
}
