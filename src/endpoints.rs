//! The URIs of the app's pages and API routes.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

/// Redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for signed in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The log-in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page for requesting a password reset.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// Signs in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// Signs out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// Registers a new user.
pub const USERS: &str = "/api/users";
/// Starts a password reset.
pub const FORGOT_PASSWORD_API: &str = "/api/forgot_password";
/// Creates transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// Updates or deletes a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// Income, expense and category totals for a date range.
pub const SUMMARY_API: &str = "/api/summary";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is the text from a left brace up to and including the next
/// right brace, e.g. '{transaction_id}' in '/api/transactions/{transaction_id}'.
/// Only the first parameter is replaced.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{id}{}",
        &endpoint_path[..param_start],
        &endpoint_path[param_end..]
    )
}

#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    #[track_caller]
    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        for endpoint in [
            endpoints::ROOT,
            endpoints::DASHBOARD_VIEW,
            endpoints::REGISTER_VIEW,
            endpoints::LOG_IN_VIEW,
            endpoints::FORGOT_PASSWORD_VIEW,
            endpoints::INTERNAL_ERROR_VIEW,
            endpoints::LOG_IN_API,
            endpoints::LOG_OUT,
            endpoints::USERS,
            endpoints::FORGOT_PASSWORD_API,
            endpoints::TRANSACTIONS_API,
            endpoints::SUMMARY_API,
        ] {
            assert_endpoint_is_valid_uri(endpoint);
        }

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION, 1));
    }

    #[test]
    fn replaces_parameter() {
        assert_eq!(
            format_endpoint(endpoints::TRANSACTION, 42),
            "/api/transactions/42"
        );
        assert_eq!(format_endpoint("/hello/{world}/bye", 1), "/hello/1/bye");
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        assert_eq!(format_endpoint("/hello/world", 1), "/hello/world");
    }

    #[test]
    fn unclosed_parameter_runs_to_end() {
        assert_eq!(format_endpoint("/hello/{world", 7), "/hello/7");
    }
}
