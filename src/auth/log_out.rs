//! Log-out route handler that closes the user's session and invalidates the auth cookies.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::{LogInState, cookie::get_user_id_from_auth_cookie, invalidate_auth_cookie},
    endpoints,
    identity::{IdentityProvider, SqliteIdentityProvider},
};

/// Sign out the current user, if any, and redirect the client to the log-in page.
pub async fn get_log_out(State(state): State<LogInState>, jar: PrivateCookieJar) -> Response {
    if let Ok(user_id) = get_user_id_from_auth_cookie(&jar) {
        if let Err(error) = state.sessions.close(user_id) {
            tracing::error!("Could not close session for user {user_id}: {error}");
        }

        let provider =
            SqliteIdentityProvider::new(state.db_connection.clone(), state.password_hash_cost);

        if let Err(error) = provider.sign_out(user_id) {
            tracing::error!("Could not sign out user {user_id}: {error}");
        }
    }

    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
