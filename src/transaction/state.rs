//! The state shared by the transaction endpoints.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, session::SessionRegistry, transaction::SqliteTransactionService};

/// The state needed to change a user's transactions or summarise them.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for storing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// Where the signed in user's ledger is kept.
    pub sessions: SessionRegistry,
}

impl TransactionState {
    pub(crate) fn service(&self) -> SqliteTransactionService {
        SqliteTransactionService::new(self.db_connection.clone())
    }
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            sessions: state.sessions.clone(),
        }
    }
}
