//! Persistence and aggregation of a user's transactions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    transaction::{Transaction, TransactionId, checked_sum},
    user::UserId,
};

/// The label used for expenses without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A window into a list of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The maximum number of transactions to return.
    pub limit: u64,
    /// The number of transactions to skip.
    pub offset: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    /// The page directly after this one.
    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Create the range from `start` to `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateRange] if `end` is before `start`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if end < start {
            return Err(Error::InvalidDateRange);
        }

        Ok(Self { start, end })
    }

    /// The calendar month that contains `date`.
    pub fn month_of(date: Date) -> Self {
        let start = date.replace_day(1).unwrap_or(date);
        let end = date
            .replace_day(date.month().length(date.year()))
            .unwrap_or(date);

        Self { start, end }
    }

    /// The first day of the range.
    pub fn start(&self) -> Date {
        self.start
    }

    /// The last day of the range.
    pub fn end(&self) -> Date {
        self.end
    }

    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Totals of the transactions in a [DateRange].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// The sum of positive amounts.
    pub income: Decimal,
    /// The magnitude of the sum of negative amounts.
    pub expenses: Decimal,
    /// Income minus expenses.
    pub net: Decimal,
    /// The number of transactions in the range.
    pub transaction_count: usize,
}

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryExpense {
    /// The category name, or [UNCATEGORIZED].
    pub category: String,
    /// The magnitude of the money spent.
    pub total: Decimal,
}

/// Stores a user's transactions and answers aggregate questions about them.
pub trait TransactionService {
    /// Store a transaction that was admitted to `owner`'s ledger.
    ///
    /// # Errors
    ///
    /// Returns [Error::DuplicateTransaction] if `owner` already has a
    /// transaction with the same ID.
    fn insert(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error>;

    /// Get a page of `owner`'s transactions, newest first.
    fn list(&self, owner: UserId, page: Page) -> Result<Vec<Transaction>, Error>;

    /// Overwrite the stored transaction with the same ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::UpdateMissingTransaction] if there is no such transaction.
    fn update(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error>;

    /// Delete the transaction with `id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::DeleteMissingTransaction] if there is no such transaction.
    fn delete(&self, owner: UserId, id: TransactionId) -> Result<(), Error>;

    /// The sum of all of `owner`'s transactions.
    fn balance(&self, owner: UserId) -> Result<Decimal, Error>;

    /// Income and expense totals for the transactions that occurred in `range`.
    fn summary(&self, owner: UserId, range: &DateRange) -> Result<TransactionSummary, Error>;

    /// Expenses in `range` grouped by category, largest first.
    fn category_expenses(
        &self,
        owner: UserId,
        range: &DateRange,
    ) -> Result<Vec<CategoryExpense>, Error>;
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                user_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT,
                amount TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                PRIMARY KEY (user_id, id)
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        occurred_at: row.get(5)?,
    })
}

/// A [TransactionService] backed by the app's SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteTransactionService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTransactionService {
    /// Create a service that uses `connection`.
    ///
    /// The transaction table must already exist, see [create_transaction_table].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn all_transactions(&self, owner: UserId) -> Result<Vec<Transaction>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        connection
            .prepare(
                "SELECT id, name, description, category, amount, occurred_at
                FROM \"transaction\" WHERE user_id = ?1",
            )?
            .query_map([owner.as_i64()], map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn transactions_in(&self, owner: UserId, range: &DateRange) -> Result<Vec<Transaction>, Error> {
        let mut transactions = self.all_transactions(owner)?;
        transactions.retain(|transaction| range.contains(transaction.occurred_at.date()));

        Ok(transactions)
    }
}

impl TransactionService for SqliteTransactionService {
    fn insert(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        connection
            .execute(
                "INSERT INTO \"transaction\"
                (user_id, id, name, description, category, amount, occurred_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    owner.as_i64(),
                    transaction.id,
                    &transaction.name,
                    &transaction.description,
                    &transaction.category,
                    transaction.amount,
                    transaction.occurred_at,
                ),
            )
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                    },
                    _,
                ) => Error::DuplicateTransaction,
                error => error.into(),
            })?;

        Ok(())
    }

    fn list(&self, owner: UserId, page: Page) -> Result<Vec<Transaction>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        connection
            .prepare(
                "SELECT id, name, description, category, amount, occurred_at
                FROM \"transaction\" WHERE user_id = ?1
                ORDER BY id DESC LIMIT ?2 OFFSET ?3",
            )?
            .query_map(
                (owner.as_i64(), page.limit as i64, page.offset as i64),
                map_transaction_row,
            )?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let rows_affected = connection.execute(
            "UPDATE \"transaction\"
            SET name = ?3, description = ?4, category = ?5, amount = ?6, occurred_at = ?7
            WHERE user_id = ?1 AND id = ?2",
            (
                owner.as_i64(),
                transaction.id,
                &transaction.name,
                &transaction.description,
                &transaction.category,
                transaction.amount,
                transaction.occurred_at,
            ),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingTransaction);
        }

        Ok(())
    }

    fn delete(&self, owner: UserId, id: TransactionId) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let rows_affected = connection.execute(
            "DELETE FROM \"transaction\" WHERE user_id = ?1 AND id = ?2",
            (owner.as_i64(), id),
        )?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingTransaction);
        }

        Ok(())
    }

    fn balance(&self, owner: UserId) -> Result<Decimal, Error> {
        checked_sum(
            self.all_transactions(owner)?
                .iter()
                .map(|transaction| transaction.amount.value()),
        )
        .ok_or(Error::BalanceOverflow)
    }

    fn summary(&self, owner: UserId, range: &DateRange) -> Result<TransactionSummary, Error> {
        let transactions = self.transactions_in(owner, range)?;

        let income = checked_sum(
            transactions
                .iter()
                .filter(|transaction| transaction.amount.is_income())
                .map(|transaction| transaction.amount.value()),
        )
        .ok_or(Error::BalanceOverflow)?;
        let expenses = checked_sum(
            transactions
                .iter()
                .filter(|transaction| transaction.amount.is_expense())
                .map(|transaction| transaction.amount.value().abs()),
        )
        .ok_or(Error::BalanceOverflow)?;

        Ok(TransactionSummary {
            income,
            expenses,
            net: income.checked_sub(expenses).ok_or(Error::BalanceOverflow)?,
            transaction_count: transactions.len(),
        })
    }

    fn category_expenses(
        &self,
        owner: UserId,
        range: &DateRange,
    ) -> Result<Vec<CategoryExpense>, Error> {
        let mut totals: HashMap<String, Decimal> = HashMap::new();

        for transaction in self.transactions_in(owner, range)? {
            if !transaction.amount.is_expense() {
                continue;
            }

            let category = transaction
                .category
                .unwrap_or_else(|| UNCATEGORIZED.to_owned());
            let total = totals.entry(category).or_default();
            *total = total
                .checked_add(transaction.amount.value().abs())
                .ok_or(Error::BalanceOverflow)?;
        }

        let mut expenses: Vec<CategoryExpense> = totals
            .into_iter()
            .map(|(category, total)| CategoryExpense { category, total })
            .collect();
        expenses.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.category.cmp(&b.category))
        });

        Ok(expenses)
    }
}
