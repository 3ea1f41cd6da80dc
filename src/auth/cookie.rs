//! Private cookies that remember which user is signed in and until when.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{
    Duration, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{Error, user::UserId};

pub(crate) const COOKIE_USER_ID: &str = "user_id";
pub(crate) const COOKIE_EXPIRY: &str = "expiry";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Date time format for the cookie expiry, e.g. "2025-01-01 00:00:00.0 +00:00:00".
const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
         sign:mandatory]:[offset_minute]:[offset_second]"
);

fn build_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

fn format_expiry(expiry: OffsetDateTime) -> Result<String, Error> {
    expiry
        .format(DATE_TIME_FORMAT)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), expiry.to_string()))
}

/// Add the auth cookies to `jar`, marking `user_id` as signed in for `duration`.
///
/// # Errors
///
/// Returns [Error::InvalidDateFormat] if the expiry cannot be formatted.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserId,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expiry = OffsetDateTime::now_utc() + duration;
    let expiry_string = format_expiry(expiry)?;

    Ok(jar
        .add(build_cookie(
            COOKIE_USER_ID,
            user_id.as_i64().to_string(),
            expiry,
        ))
        .add(build_cookie(COOKIE_EXPIRY, expiry_string, expiry)))
}

/// Overwrite the auth cookies with expired ones so the client drops them.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expired = |name| {
        let mut cookie = build_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expired(COOKIE_USER_ID)).add(expired(COOKIE_EXPIRY))
}

/// Push the expiry of the auth cookies to at least `duration` from now.
///
/// An expiry that is already later, e.g. from "remember me", is kept.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::CookieMissing] if either auth cookie is not in the jar.
/// - [Error::InvalidDateFormat] if the stored expiry cannot be parsed or the new one formatted.
pub fn extend_auth_cookie(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let user_id_cookie = jar.get(COOKIE_USER_ID).ok_or(Error::CookieMissing)?;
    let expiry_cookie = jar.get(COOKIE_EXPIRY).ok_or(Error::CookieMissing)?;

    let current_expiry = parse_expiry(expiry_cookie.value_trimmed())?;
    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| {
            Error::InvalidDateFormat("expiry overflowed".to_owned(), format!("{duration:?}"))
        })?;
    let expiry = max(current_expiry, new_expiry);

    let expiry_string = format_expiry(expiry)?;

    // Request cookies only carry a name and value, so the attributes are set again.
    Ok(jar
        .add(build_cookie(
            COOKIE_USER_ID,
            user_id_cookie.value_trimmed().to_owned(),
            expiry,
        ))
        .add(build_cookie(COOKIE_EXPIRY, expiry_string, expiry)))
}

/// Get the signed in user from the auth cookies in `jar`.
///
/// # Errors
///
/// Returns:
/// - [Error::CookieMissing] if either auth cookie is not in the jar.
/// - [Error::InvalidDateFormat] if the expiry cannot be parsed.
/// - [Error::InvalidCredentials] if the user ID is malformed or the cookie has expired.
pub fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserId, Error> {
    let user_id_cookie = jar.get(COOKIE_USER_ID).ok_or(Error::CookieMissing)?;
    let expiry_cookie = jar.get(COOKIE_EXPIRY).ok_or(Error::CookieMissing)?;

    if parse_expiry(expiry_cookie.value_trimmed())? <= OffsetDateTime::now_utc() {
        return Err(Error::InvalidCredentials);
    }

    user_id_cookie
        .value_trimmed()
        .parse()
        .map(UserId::new)
        .map_err(|_| Error::InvalidCredentials)
}

fn parse_expiry(text: &str) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::parse(text, DATE_TIME_FORMAT)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), text.to_owned()))
}
