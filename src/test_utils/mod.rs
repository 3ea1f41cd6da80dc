#![allow(missing_docs)]

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    AppState,
    password::PasswordHash,
    user::{User, create_user},
};

pub(crate) use form::{assert_form_input, assert_hx_endpoint, must_get_form};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_hx_redirect, get_header};

/// The lowest cost bcrypt accepts, used so that tests hash passwords quickly.
pub(crate) const TEST_HASH_COST: u32 = 4;

/// An [AppState] backed by an in-memory database with the UTC timezone.
pub(crate) fn test_app_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");

    AppState::new(connection, "42", "Etc/UTC")
        .expect("Could not create app state")
        .with_password_hash_cost(TEST_HASH_COST)
}

/// Register the user "priya" with the email "priya@example.com" and the password "secret1".
pub(crate) fn sign_up_test_user(connection: &Arc<Mutex<Connection>>) -> User {
    let password_hash = PasswordHash::from_raw_password("secret1", TEST_HASH_COST)
        .expect("Could not hash password");

    create_user(
        "priya",
        "priya@example.com",
        password_hash,
        &connection.lock().expect("Could not lock database"),
    )
    .expect("Could not create test user")
}
