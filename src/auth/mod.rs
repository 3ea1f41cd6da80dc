//! Signing users in and out, and guarding routes that need a signed in user.

mod cookie;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;
mod register;

pub use cookie::{
    DEFAULT_COOKIE_DURATION, extend_auth_cookie, get_user_id_from_auth_cookie,
    invalidate_auth_cookie, set_auth_cookie,
};
pub use forgot_password::{get_forgot_password_page, post_forgot_password};
pub use log_in::{LogInState, get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use register::{get_register_page, register_user};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_EXPIRY, COOKIE_USER_ID};
