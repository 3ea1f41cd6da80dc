//! Sets up the application's database.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{transaction::create_transaction_table, user::create_user_table};

/// Create the tables for users and their transactions if they do not exist.
///
/// The tables are created in a single exclusive transaction.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
