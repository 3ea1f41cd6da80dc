//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since it accepts the empty optional fields that
// the dashboard form sends.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;

use crate::{
    Error, endpoints,
    timezone::local_now,
    transaction::{TransactionForm, TransactionState},
    user::UserId,
};

/// A route handler for adding a transaction to the user's ledger, redirects to
/// the dashboard on success.
///
/// Invalid forms get an alert listing every broken rule with the status code
/// 422 and nothing is stored.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Some(now) = local_now(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let service = state.service();
    let result = state
        .sessions
        .with_session(user_id, &service, |session| {
            session.add_transaction(&form, now, &service)
        })
        .and_then(|result| result);

    match result {
        Ok(_) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::Validation(error)) => {
            tracing::warn!("Rejected transaction from user {user_id}: {error}");
            Error::Validation(error).into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not create transaction for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
