//! The registration page and the handler that creates accounts.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};

use crate::{
    Error,
    auth::{LogInState, invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    identity::{IdentityProvider, SignUpRequest, SqliteIdentityProvider},
    password::MIN_PASSWORD_LENGTH,
    transaction::SqliteTransactionService,
};

fn registration_form(request: &SignUpRequest, errors: &[String]) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Username", "username", "text", &request.username, None))
            (text_input("Email", "email", "email", &request.email, None))
            (password_input("Password", "password", MIN_PASSWORD_LENGTH as u8, None))
            (password_input("Confirm Password", "confirm_password", MIN_PASSWORD_LENGTH as u8, None))

            @if !errors.is_empty()
            {
                ul id="registration-errors" class="text-red-500 text-base list-disc list-inside"
                {
                    @for error in errors
                    {
                        li { (error) }
                    }
                }
            }

            (submit_button("Create Account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let form = registration_form(&SignUpRequest::default(), &[]);
    let content = log_in_register("Create an account", &form);

    base("Register", &[], &content).into_response()
}

/// Register a user, sign them in and redirect to the dashboard.
///
/// If the request breaks any registration rule, or the account already
/// exists, the form is returned with every problem listed.
pub async fn register_user(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(request): Form<SignUpRequest>,
) -> Response {
    let provider =
        SqliteIdentityProvider::new(state.db_connection.clone(), state.password_hash_cost);

    let outcome = match provider.sign_up(&request) {
        Ok(outcome) => outcome,
        Err(Error::Validation(error)) => {
            return registration_form(&request, &error.violations).into_response();
        }
        Err(Error::DuplicateEmail) => {
            return registration_form(
                &request,
                &["An account with this email already exists".to_owned()],
            )
            .into_response();
        }
        Err(Error::DuplicateUsername) => {
            return registration_form(&request, &["This username is already taken".to_owned()])
                .into_response();
        }
        Err(error) => {
            tracing::error!("Could not register user: {error}");
            return (
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
                .into_response();
        }
    };

    let user_id = outcome.user.id;
    let service = SqliteTransactionService::new(state.db_connection.clone());

    if let Err(error) = state.sessions.open(user_id, &service) {
        tracing::error!("Could not open a ledger for new user {user_id}: {error}");
    }

    match set_auth_cookie(jar.clone(), user_id, state.cookie_duration) {
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
