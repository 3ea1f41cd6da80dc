//! Defines the endpoint for replacing an existing transaction.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;

use crate::{
    Error, endpoints,
    timezone::local_now,
    transaction::{TransactionForm, TransactionId, TransactionState},
    user::UserId,
};

/// A route handler for replacing every field of a transaction, redirects to
/// the dashboard on success.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
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
            session.update_transaction(transaction_id, &form, now, &service)
        })
        .and_then(|result| result);

    match result {
        Ok(_) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::Validation(error)) => {
            tracing::warn!("Rejected update to transaction {transaction_id}: {error}");
            Error::Validation(error).into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not update transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}
