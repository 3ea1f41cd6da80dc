//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_forgot_password_page, get_log_in_page, get_log_out,
        get_register_page, post_forgot_password, post_log_in, register_user,
    },
    dashboard::get_dashboard_page,
    endpoints,
    error_page::{get_404_not_found, get_internal_server_error_page},
    logging::logging_middleware,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_summary_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::FORGOT_PASSWORD_API, post(post_forgot_password))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::SUMMARY_API, get(get_summary_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by htmx, so they need the HX-REDIRECT header for auth redirects to work.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::TRANSACTION,
                put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{sign_up_test_user, test_app_state},
        transaction::{Page, TransactionService},
        user::get_user_by_email,
    };

    use super::build_router;

    fn get_test_server() -> (TestServer, crate::AppState) {
        let state = test_app_state();
        sign_up_test_user(&state.db_connection);
        let mut server =
            TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");
        server.save_cookies();

        (server, state)
    }

    async fn log_in(server: &TestServer) {
        server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", "priya@example.com"), ("password", "secret1")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
    }

    fn one_hour_ago() -> String {
        (OffsetDateTime::now_utc() - Duration::hours(1))
            .format(&Rfc3339)
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_log_in_without_cookie() {
        let (server, _) = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard_when_signed_in() {
        let (server, _) = get_test_server();
        log_in(&server).await;

        let response = server.get(endpoints::ROOT).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn htmx_routes_redirect_with_header_without_cookie() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[("name", "Salary"), ("amount", "+100")])
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found() {
        let (server, _) = get_test_server();

        server
            .get("/not/a/page")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn add_then_delete_transaction() {
        let (server, state) = get_test_server();
        log_in(&server).await;
        let user_id = get_user_by_email("priya@example.com", &state.db_connection.lock().unwrap())
            .unwrap()
            .id;

        server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[
                ("name", "Salary"),
                ("amount", "+50000"),
                ("occurred_at", &one_hour_ago()),
                ("category", ""),
                ("description", ""),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let service = state.transaction_service();
        let stored = service.list(user_id, Page::default()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(service.balance(user_id).unwrap(), dec!(50000));

        let dashboard = server.get(endpoints::DASHBOARD_VIEW).await;
        dashboard.assert_status_ok();
        dashboard.assert_text_contains("Transaction History (1)");
        dashboard.assert_text_contains("₹50,000.00");

        server
            .delete(&format_endpoint(endpoints::TRANSACTION, stored[0].id))
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert_eq!(service.balance(user_id).unwrap(), dec!(0));

        server
            .delete(&format_endpoint(endpoints::TRANSACTION, stored[0].id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn log_out_ends_session() {
        let (server, _) = get_test_server();
        log_in(&server).await;

        server
            .get(endpoints::LOG_OUT)
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let response = server.get(endpoints::DASHBOARD_VIEW).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }
}
