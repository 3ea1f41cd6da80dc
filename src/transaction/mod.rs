//! Transactions: the signed amount type, the rules that admit them to a
//! ledger, their storage, and the endpoints that change them.

mod amount;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod service;
mod state;
mod summary_endpoint;
mod validation;

pub use amount::{Amount, AmountParseError, MAX_AMOUNT, checked_sum};
pub use core::{NewTransaction, Transaction, TransactionId};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use service::{
    CategoryExpense, DateRange, Page, SqliteTransactionService, TransactionService,
    TransactionSummary, UNCATEGORIZED, create_transaction_table,
};
pub use state::TransactionState;
pub use summary_endpoint::{SummaryQuery, SummaryResponse, get_summary_endpoint};
pub use validation::{
    MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, TransactionForm, ValidationError, entry_violations,
    parse_occurred_at, persistence_violations, validate,
};
