//! Defines the core data models for transactions.

use time::OffsetDateTime;

use crate::transaction::Amount;

/// Alias for the integer type used for transaction IDs.
pub type TransactionId = i64;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are only created by a [Ledger](crate::Ledger) after the
/// candidate has passed validation, see [crate::transaction::validate].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction, unique within its ledger.
    pub id: TransactionId,
    /// A short name for the transaction, e.g. "Salary" or "Rent".
    pub name: String,
    /// Free text detailing the transaction, may be empty.
    pub description: String,
    /// An optional label used to group expenses, e.g. "Groceries".
    pub category: Option<String>,
    /// The amount of money spent or earned in this transaction.
    pub amount: Amount,
    /// When the transaction happened.
    pub occurred_at: OffsetDateTime,
}

/// A validated transaction that has not been given an ID yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The trimmed name.
    pub name: String,
    /// The trimmed description.
    pub description: String,
    /// The trimmed category, `None` if it was left blank.
    pub category: Option<String>,
    /// The signed amount.
    pub amount: Amount,
    /// When the transaction happened.
    pub occurred_at: OffsetDateTime,
}

impl NewTransaction {
    /// Attach `id` to create the [Transaction].
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            amount: self.amount,
            occurred_at: self.occurred_at,
        }
    }
}
