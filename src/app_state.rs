//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    Error,
    auth::DEFAULT_COOKIE_DURATION,
    db::initialize,
    identity::SqliteIdentityProvider,
    password::PasswordHash,
    session::SessionRegistry,
    transaction::SqliteTransactionService,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The ledgers of signed in users.
    pub sessions: SessionRegistry,

    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Kolkata".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
            sessions: SessionRegistry::new(),
            password_hash_cost: PasswordHash::DEFAULT_COST,
        })
    }

    /// Use `cost` rounds when hashing new passwords.
    ///
    /// Tests use the minimum cost of 4 so that registering users is fast.
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }

    /// The transaction service backed by this state's database.
    pub fn transaction_service(&self) -> SqliteTransactionService {
        SqliteTransactionService::new(self.db_connection.clone())
    }

    /// The identity provider backed by this state's database.
    pub fn identity_provider(&self) -> SqliteIdentityProvider {
        SqliteIdentityProvider::new(self.db_connection.clone(), self.password_hash_cost)
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
