//! Formatting of money and dates for display.

use rust_decimal::{Decimal, RoundingStrategy};
use time::{
    OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

/// Format `amount` as Indian rupees with Indian digit grouping, e.g. "₹1,23,456.78".
///
/// Negative amounts are prefixed with a minus sign, e.g. "-₹50.00".
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let magnitude = magnitude.to_string();
    let (whole, fraction) = magnitude
        .split_once('.')
        .unwrap_or((magnitude.as_str(), "00"));

    format!("{sign}₹{}.{fraction}", group_indian(whole))
}

/// Format a transaction amount for the history list, e.g. "+₹500.00" or "-₹20.00".
pub fn format_signed_amount(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format_currency(amount)
    } else {
        format!("+{}", format_currency(amount))
    }
}

/// Group digits as thousands then hundreds, e.g. "1234567" becomes "12,34,567".
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;

    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }

    if !rest.is_empty() {
        groups.push(rest);
    }

    groups.reverse();
    groups.push(last_three);
    groups.join(",")
}

const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[month]/[day]/[year], [hour repr:12]:[minute] [period]"
);
const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day padding:none] [month repr:short] [year]");
const DATE_TIME_LOCAL_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Format a timestamp for the history list, e.g. "10/16/2026, 02:30 PM".
pub fn format_date_time(date_time: OffsetDateTime) -> String {
    date_time
        .format(DATE_TIME_FORMAT)
        .unwrap_or_else(|_| date_time.to_string())
}

/// Format a date for headings, e.g. "16 Oct 2026".
pub fn format_date(date_time: OffsetDateTime) -> String {
    date_time
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| date_time.date().to_string())
}

/// The value for a `datetime-local` input, e.g. "2026-10-16T14:30".
pub fn datetime_local_value(date_time: OffsetDateTime) -> String {
    date_time
        .format(DATE_TIME_LOCAL_FORMAT)
        .unwrap_or_default()
}
