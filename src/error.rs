//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert,
    error_page::{InternalServerError, NotFoundError},
    transaction::ValidationError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A candidate transaction or registration broke one or more rules.
    ///
    /// Nothing was changed. The client can fix the input and try again.
    #[error("{0}")]
    Validation(ValidationError),

    /// The email and password do not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// A date or date-time string, e.g. in the expiry cookie or a query
    /// parameter, could not be parsed or formatted.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not parse date string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that does not meet the requirements.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email is already used by another account.
    #[error("the email is already registered")]
    DuplicateEmail,

    /// The username is already used by another account.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A total of stored amounts is too large to represent.
    #[error("the total of the amounts is too large")]
    BalanceOverflow,

    /// The end of a date range came before its start.
    #[error("the end date must not be before the start date")]
    InvalidDateRange,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Could not acquire the lock on the open sessions
    #[error("could not acquire the session lock")]
    SessionLockError,

    /// Tried to store a transaction with an ID that is already stored
    #[error("a transaction with the same ID is already in the database")]
    DuplicateTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Error::Validation(value)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError | Error::SessionLockError => {
                InternalServerError::default().into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::Validation(error) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Please check your input".to_owned(),
                    details: error.to_string(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::InvalidDateFormat(_, date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date".to_owned(),
                    details: format!("Could not read the date \"{date}\". Use the format YYYY-MM-DD."),
                },
            ),
            Error::InvalidDateRange => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date range".to_owned(),
                    details: "The end date must be on or after the start date.".to_owned(),
                },
            ),
            Error::NotFound | Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update transaction".to_owned(),
                    details: "The transaction could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete transaction".to_owned(),
                    details: "The transaction could not be found. \
                    Try refreshing the page to see if the transaction has already been deleted."
                        .to_owned(),
                },
            ),
            Error::DuplicateTransaction => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Could not save transaction".to_owned(),
                    details: "A transaction with the same ID already exists. \
                    Try refreshing the page and adding the transaction again."
                        .to_owned(),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
