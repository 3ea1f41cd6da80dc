//! Defines the JSON endpoint that totals a user's transactions over a date range.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    timezone::local_now,
    transaction::{
        CategoryExpense, DateRange, TransactionService, TransactionState, TransactionSummary,
    },
    user::UserId,
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The optional bounds of the summary, formatted as YYYY-MM-DD.
///
/// A missing bound defaults to the first or last day of the current month.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// The body of a summary response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryResponse {
    pub start: String,
    pub end: String,
    pub summary: TransactionSummary,
    pub category_expenses: Vec<CategoryExpense>,
}

/// Income, expense and category totals for the transactions in a date range.
pub async fn get_summary_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let Some(now) = local_now(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let range = match parse_range(&query, now.date()) {
        Ok(range) => range,
        Err(error) => {
            tracing::warn!("Rejected summary query {query:?}: {error}");
            return error.into_alert_response();
        }
    };

    let service = state.service();
    let summary = service
        .summary(user_id, &range)
        .and_then(|summary| Ok((summary, service.category_expenses(user_id, &range)?)));

    match summary {
        Ok((summary, category_expenses)) => Json(SummaryResponse {
            start: range.start().to_string(),
            end: range.end().to_string(),
            summary,
            category_expenses,
        })
        .into_response(),
        Err(error) => {
            tracing::error!("Could not summarise transactions for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn parse_range(query: &SummaryQuery, today: Date) -> Result<DateRange, Error> {
    let month = DateRange::month_of(today);
    let start = parse_date(query.start.as_deref())?.unwrap_or(month.start());
    let end = parse_date(query.end.as_deref())?.unwrap_or(month.end());

    DateRange::new(start, end)
}

fn parse_date(text: Option<&str>) -> Result<Option<Date>, Error> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Date::parse(text, DATE_FORMAT)
            .map(Some)
            .map_err(|error| Error::InvalidDateFormat(error.to_string(), text.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use time::{Date, Month, OffsetDateTime, Time, UtcOffset};

    use crate::{
        endpoints,
        test_utils::{sign_up_test_user, test_app_state},
        transaction::{
            Amount, CategoryExpense, Transaction, TransactionService, TransactionState,
            TransactionSummary,
        },
        user::UserId,
    };

    use super::{SummaryQuery, SummaryResponse, get_summary_endpoint, parse_range};

    fn transaction(id: i64, amount: Amount, category: Option<&str>, date: Date) -> Transaction {
        Transaction {
            id,
            name: format!("transaction {id}"),
            description: String::new(),
            category: category.map(str::to_owned),
            amount,
            occurred_at: date.with_time(Time::MIDNIGHT).assume_offset(UtcOffset::UTC),
        }
    }

    fn get_test_server() -> TestServer {
        let state: TransactionState = axum::extract::FromRef::from_ref(&test_app_state());
        let user_id = sign_up_test_user(&state.db_connection).id;
        let service = state.service();
        let march = |day| Date::from_calendar_date(2025, Month::March, day).unwrap();

        for stored in [
            transaction(1, Amount::new(dec!(50000)), None, march(1)),
            transaction(2, Amount::new(dec!(-15000)), Some("Rent"), march(2)),
            transaction(3, Amount::new(dec!(-500)), Some("Food"), march(20)),
            transaction(4, Amount::new(dec!(-100)), Some("Food"), march(31)),
        ] {
            service.insert(user_id, &stored).unwrap();
        }

        let app = Router::new()
            .route(endpoints::SUMMARY_API, get(get_summary_endpoint))
            .layer(middleware::from_fn(
                move |mut request: axum::extract::Request, next: middleware::Next| async move {
                    request.extensions_mut().insert::<UserId>(user_id);
                    next.run(request).await
                },
            ))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn summarises_date_range() {
        let server = get_test_server();

        let response = server
            .get(endpoints::SUMMARY_API)
            .add_query_params([("start", "2025-03-01"), ("end", "2025-03-20")])
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<SummaryResponse>(),
            SummaryResponse {
                start: "2025-03-01".to_owned(),
                end: "2025-03-20".to_owned(),
                summary: TransactionSummary {
                    income: dec!(50000),
                    expenses: dec!(15500),
                    net: dec!(34500),
                    transaction_count: 3,
                },
                category_expenses: vec![
                    CategoryExpense {
                        category: "Rent".to_owned(),
                        total: dec!(15000),
                    },
                    CategoryExpense {
                        category: "Food".to_owned(),
                        total: dec!(500),
                    },
                ],
            }
        );
    }

    #[tokio::test]
    async fn rejects_malformed_date() {
        let server = get_test_server();

        server
            .get(endpoints::SUMMARY_API)
            .add_query_params([("start", "01/03/2025")])
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_end_before_start() {
        let server = get_test_server();

        server
            .get(endpoints::SUMMARY_API)
            .add_query_params([("start", "2025-03-20"), ("end", "2025-03-01")])
            .await
            .assert_status_bad_request();
    }

    #[test]
    fn missing_bounds_default_to_current_month() {
        let today = OffsetDateTime::now_utc().date();

        let range = parse_range(&SummaryQuery::default(), today).unwrap();

        assert_eq!(range.start().day(), 1);
        assert_eq!(range.start().month(), today.month());
        assert_eq!(range.end().month(), today.month());
        assert!(range.contains(today));
    }
}
