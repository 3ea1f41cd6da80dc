//! MyFinance is a web app for tracking personal income and expenses.
//!
//! Each signed in user has a ledger of transactions with a running balance.
//! Candidate transactions pass two rule sets before they are admitted, and the
//! dashboard animates the balance towards its new value after every change.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod dashboard;
mod db;
mod display_balance;
mod endpoints;
mod error;
mod error_page;
mod format;
mod html;
mod identity;
mod ledger;
mod logging;
mod navigation;
mod password;
mod routing;
mod session;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, create_cookie_key};
pub use db::initialize as initialize_db;
pub use display_balance::{DisplayBalance, TICK_INTERVAL};
pub use error::Error;
pub use identity::{IdentityProvider, SignUpOutcome, SignUpRequest, SqliteIdentityProvider};
pub use ledger::Ledger;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use session::{Session, SessionRegistry};
pub use timezone::get_local_offset;
pub use transaction::{
    Amount, CategoryExpense, DateRange, Page, SqliteTransactionService, Transaction,
    TransactionForm, TransactionId, TransactionService, TransactionSummary, ValidationError,
    validate,
};
pub use user::{User, UserId, get_user_by_email, get_user_by_id, update_password};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
