//! The page for requesting a password reset.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    auth::LogInState,
    endpoints,
    html::{LINK_STYLE, base, log_in_register, submit_button, text_input},
    identity::{IdentityProvider, SqliteIdentityProvider},
};

/// The message shown after a reset was requested, whether or not the email is registered.
pub const RESET_REQUESTED_MSG: &str =
    "If an account exists for that email, the administrator has been asked to reset its password.";

fn forgot_password_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::FORGOT_PASSWORD_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            p class="text-sm text-gray-700 dark:text-gray-300"
            {
                "Enter the email you registered with. Passwords are reset by the
                server administrator with the "
                code { "reset_password" }
                " tool."
            }

            (text_input("Email", "email", "email", "", None))
            (submit_button("Request Reset"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered it? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Log in here"
                }
            }
        }
    }
}

/// Renders a page for requesting a password reset.
pub async fn get_forgot_password_page() -> Response {
    let content = log_in_register("Forgot your password?", &forgot_password_form());

    base("Forgot Password", &[], &content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Record a password reset request.
///
/// The response is the same for registered and unknown emails.
pub async fn post_forgot_password(
    State(state): State<LogInState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let provider =
        SqliteIdentityProvider::new(state.db_connection.clone(), state.password_hash_cost);

    if let Err(error) = provider.reset_password(&form.email) {
        tracing::error!("Could not request password reset: {error}");
    }

    html! {
        p id="reset-requested" class="text-green-700 dark:text-green-400"
        {
            (RESET_REQUESTED_MSG)
        }
    }
    .into_response()
}
