use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    Error, endpoints,
    transaction::{TransactionId, TransactionState},
    user::UserId,
};

/// A route handler for deleting a transaction, redirects to the dashboard on success.
///
/// Responds with a 404 alert if the user's ledger has no such transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let service = state.service();
    let result = state
        .sessions
        .with_session(user_id, &service, |session| {
            session.remove_transaction(transaction_id, &service)
        })
        .and_then(|result| result);

    match result {
        Ok(Some(_)) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Ok(None) => {
            tracing::warn!("User {user_id} tried to delete missing transaction {transaction_id}");
            Error::DeleteMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}
