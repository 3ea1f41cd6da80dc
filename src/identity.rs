//! Registering users and checking who they are.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error, PasswordHash,
    password::MIN_PASSWORD_LENGTH,
    transaction::ValidationError,
    user::{User, UserId, create_user, get_user_by_email},
};

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;

/// The raw data entered by the user in the registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignUpRequest {
    /// The name shown in the app.
    pub username: String,
    /// The email the user will sign in with.
    pub email: String,
    /// The chosen password.
    pub password: String,
    /// The chosen password typed a second time.
    pub confirm_password: String,
}

/// The result of a successful registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    /// The newly registered user.
    pub user: User,
    /// Whether the user must confirm their email before they can sign in.
    pub needs_confirmation: bool,
}

/// Registers users and verifies their credentials.
pub trait IdentityProvider {
    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::Validation] listing every broken registration rule.
    /// - [Error::DuplicateEmail] or [Error::DuplicateUsername] if the account already exists.
    fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, Error>;

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCredentials] if the email is unknown or the
    /// password is wrong.
    fn sign_in(&self, email: &str, password: &str) -> Result<User, Error>;

    /// End the user's authenticated session with the provider.
    ///
    /// [SqliteIdentityProvider] keeps no sessions of its own, so it only logs
    /// the event.
    fn sign_out(&self, user_id: UserId) -> Result<(), Error>;

    /// Start a password reset for `email`.
    ///
    /// Succeeds whether or not `email` is registered. [SqliteIdentityProvider]
    /// has no mail channel to send a reset link through: it logs the request
    /// and leaves the password unchanged, and an operator sets a new one with
    /// the `reset_password` tool.
    fn reset_password(&self, email: &str) -> Result<(), Error>;
}

/// Check a registration request and return a message for every broken rule.
pub fn registration_violations(request: &SignUpRequest) -> Vec<String> {
    let mut violations = Vec::new();
    let username = request.username.trim();
    let username_length = username.chars().count();

    if username_length < MIN_USERNAME_LENGTH {
        violations.push(format!(
            "Username must be at least {MIN_USERNAME_LENGTH} characters long"
        ));
    }

    if username_length > MAX_USERNAME_LENGTH {
        violations.push(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        violations.push("Username can only contain letters, numbers, and underscores".to_owned());
    }

    if !is_valid_email(request.email.trim()) {
        violations.push("Please enter a valid email address".to_owned());
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }

    if request.password != request.confirm_password {
        violations.push("Passwords do not match".to_owned());
    }

    violations
}

/// Whether `email` looks like `name@domain.tld`.
///
/// The local part and domain are runs of word characters that may be joined
/// by single dots or hyphens, and the domain must end in one or more labels
/// of two or three word characters, e.g. ".com" or ".co.in".
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if !is_joined_words(local) {
        return false;
    }

    // The domain must end with at least one short label after the main part.
    let labels: Vec<&str> = domain.split('.').collect();

    (1..labels.len()).any(|suffix_start| {
        let (main, suffix) = labels.split_at(suffix_start);

        is_joined_words(&main.join("."))
            && suffix
                .iter()
                .all(|label| (2..=3).contains(&label.chars().count()) && is_word(label))
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_word_char)
}

/// Words joined by single `.` or `-` separators, e.g. "first.last-name".
fn is_joined_words(text: &str) -> bool {
    text.split(['.', '-']).all(is_word)
}

/// Identity provider that keeps users in the app's SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteIdentityProvider {
    connection: Arc<Mutex<Connection>>,
    password_hash_cost: u32,
}

impl SqliteIdentityProvider {
    /// Create a provider that hashes passwords with `password_hash_cost` rounds.
    pub fn new(connection: Arc<Mutex<Connection>>, password_hash_cost: u32) -> Self {
        Self {
            connection,
            password_hash_cost,
        }
    }
}

impl IdentityProvider for SqliteIdentityProvider {
    fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, Error> {
        let violations = registration_violations(request);

        if !violations.is_empty() {
            tracing::warn!("Rejected registration: {}", violations.join(". "));
            return Err(Error::Validation(ValidationError { violations }));
        }

        let password_hash =
            PasswordHash::from_raw_password(&request.password, self.password_hash_cost)?;
        let email = normalize_email(&request.email);

        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let user = create_user(request.username.trim(), &email, password_hash, &connection)?;

        tracing::info!("Registered user {}", user.id);

        Ok(SignUpOutcome {
            user,
            needs_confirmation: false,
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<User, Error> {
        let user = {
            let connection = self
                .connection
                .lock()
                .map_err(|_| Error::DatabaseLockError)?;

            match get_user_by_email(&normalize_email(email), &connection) {
                Ok(user) => user,
                Err(Error::NotFound) => return Err(Error::InvalidCredentials),
                Err(error) => return Err(error),
            }
        };

        match user.password_hash.verify(password) {
            Ok(true) => {
                tracing::info!("User {} signed in", user.id);
                Ok(user)
            }
            Ok(false) => Err(Error::InvalidCredentials),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    fn sign_out(&self, user_id: UserId) -> Result<(), Error> {
        tracing::info!("User {user_id} signed out");

        Ok(())
    }

    fn reset_password(&self, email: &str) -> Result<(), Error> {
        tracing::info!(
            "Password reset requested for {}. Use the reset_password tool to set a new password.",
            normalize_email(email)
        );

        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
