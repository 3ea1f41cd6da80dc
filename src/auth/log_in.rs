//! The log-in page and the handler that signs users in.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    identity::{IdentityProvider, SqliteIdentityProvider},
    session::SessionRegistry,
    transaction::SqliteTransactionService,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
pub const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect email or password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Email", "email", "email", email, None))
            (password_input("Password", "password", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            (submit_button("Log in"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "
                a href=(endpoints::FORGOT_PASSWORD_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Reset it here"
                }
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Register here"
                }
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let form = log_in_form("", None);
    let content = log_in_register("Log in to your account", &form);

    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users and loading their ledgers.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the signed in user's ledger is kept.
    pub sessions: SessionRegistry,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
            sessions: state.sessions.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// There is no validation here since the email and password are compared
/// against the registered users.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInForm {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it is either set to some string
    /// or missing. Any `Some` value means "remember me".
    pub remember_me: Option<String>,
}

/// Handler for log-in requests via the POST method.
///
/// On success the user's ledger is loaded, the auth cookie is set and the
/// client is redirected to the dashboard. Otherwise, the form is returned with
/// an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    let provider =
        SqliteIdentityProvider::new(state.db_connection.clone(), state.password_hash_cost);

    let user = match provider.sign_in(&form.email, &form.password) {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => {
            tracing::warn!("Failed log-in attempt for {}", form.email);
            return log_in_form(&form.email, Some(INVALID_CREDENTIALS_ERROR_MSG)).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(&form.email, Some(INTERNAL_ERROR_MSG)).into_response();
        }
    };

    let service = SqliteTransactionService::new(state.db_connection.clone());

    if let Err(error) = state.sessions.open(user.id, &service) {
        tracing::error!("Could not load the ledger for user {}: {error}", user.id);
        return log_in_form(&form.email, Some(INTERNAL_ERROR_MSG)).into_response();
    }

    let cookie_duration = if form.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    match set_auth_cookie(jar.clone(), user.id, cookie_duration) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            updated_jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}
