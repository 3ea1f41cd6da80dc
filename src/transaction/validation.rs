//! The two rule sets that gate which candidate transactions may enter a ledger.
//!
//! The entry rules check the raw text the user typed in, the same way the
//! transaction form does. The persistence rules check the parsed values right
//! before they are stored and add the length limits of the storage columns.
//! [validate] applies both, in that order.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};
use unicode_segmentation::UnicodeSegmentation;

use crate::transaction::{Amount, AmountParseError, MAX_AMOUNT, NewTransaction};

/// The maximum number of characters allowed in a transaction name.
pub const MAX_NAME_LENGTH: usize = 100;
/// The maximum number of characters allowed in a transaction description.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// The raw form data for a transaction, exactly as the user entered it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionForm {
    /// A short name for the transaction.
    pub name: String,
    /// Optional free text detailing the transaction.
    #[serde(default)]
    pub description: String,
    /// The amount with an explicit sign, e.g. "+100" for income or "-50" for an expense.
    pub amount: String,
    /// When the transaction happened, either RFC 3339 or the local
    /// `YYYY-MM-DDTHH:MM` format produced by `datetime-local` inputs.
    pub occurred_at: String,
    /// Optional category label.
    #[serde(default)]
    pub category: String,
}

/// One or more rules that a candidate transaction broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// A human readable message for every broken rule, in rule order.
    pub violations: Vec<String>,
}

impl ValidationError {
    /// Whether any of the messages contain `needle`, ignoring case.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();

        self.violations
            .iter()
            .any(|violation| violation.to_lowercase().contains(&needle))
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.violations.join(". "))
    }
}

impl std::error::Error for ValidationError {}

/// Check the raw form fields against the rules of the transaction form.
///
/// Every rule is checked, so the result lists all problems at once. An empty
/// list means the form may be parsed.
///
/// Local timestamps without an offset are read in the offset of `now`.
pub fn entry_violations(form: &TransactionForm, now: OffsetDateTime) -> Vec<String> {
    let mut violations = Vec::new();

    if form.name.trim().is_empty() {
        violations.push("Transaction name is required".to_owned());
    }

    match Amount::parse_signed(&form.amount) {
        Ok(_) => {}
        Err(AmountParseError::Empty) => violations.push("Amount is required".to_owned()),
        Err(AmountParseError::MissingSign) => {
            violations.push("Amount must start with + or - sign".to_owned())
        }
        Err(AmountParseError::NotANumber | AmountParseError::Zero) => {
            violations.push("Please enter a valid non-zero number".to_owned())
        }
    }

    if form.occurred_at.trim().is_empty() {
        violations.push("Date and time are required".to_owned());
    } else {
        match parse_occurred_at(&form.occurred_at, now) {
            None => violations.push("Please enter a valid date and time".to_owned()),
            Some(occurred_at) if occurred_at > now => {
                violations.push("Date cannot be in the future".to_owned())
            }
            Some(_) => {}
        }
    }

    violations
}

/// Check a parsed transaction right before it is stored.
///
/// This is stricter than [entry_violations]: it enforces the storage length
/// limits and does not care how the amount was written, only that it is not
/// zero.
pub fn persistence_violations(transaction: &NewTransaction, now: OffsetDateTime) -> Vec<String> {
    let mut violations = Vec::new();
    let name = transaction.name.trim();

    if name.is_empty() {
        violations.push("Transaction name is required".to_owned());
    }

    if character_count(name) > MAX_NAME_LENGTH {
        violations.push(format!(
            "Transaction name cannot exceed {MAX_NAME_LENGTH} characters"
        ));
    }

    if transaction.amount.is_zero() {
        violations.push("Amount is required and cannot be zero".to_owned());
    } else if transaction.amount.value().abs() > MAX_AMOUNT {
        violations.push("Amount is too large".to_owned());
    }

    if transaction.occurred_at > now {
        violations.push("Transaction date cannot be in the future".to_owned());
    }

    if character_count(&transaction.description) > MAX_DESCRIPTION_LENGTH {
        violations.push(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
        ));
    }

    violations
}

/// Run both rule sets and produce the transaction to admit.
///
/// # Errors
///
/// Returns a [ValidationError] with every message from the first rule set
/// that failed.
pub fn validate(
    form: &TransactionForm,
    now: OffsetDateTime,
) -> Result<NewTransaction, ValidationError> {
    let violations = entry_violations(form, now);

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    let transaction = parse_form(form, now).ok_or_else(|| ValidationError {
        violations: vec!["Please check the transaction details and try again".to_owned()],
    })?;

    let violations = persistence_violations(&transaction, now);

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    Ok(transaction)
}

fn parse_form(form: &TransactionForm, now: OffsetDateTime) -> Option<NewTransaction> {
    let amount = Amount::parse_signed(&form.amount).ok()?;
    let occurred_at = parse_occurred_at(&form.occurred_at, now)?;
    let category = form.category.trim();

    Some(NewTransaction {
        name: form.name.trim().to_owned(),
        description: form.description.trim().to_owned(),
        category: (!category.is_empty()).then(|| category.to_owned()),
        amount,
        occurred_at,
    })
}

const LOCAL_DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const LOCAL_DATE_TIME_WITH_SECONDS_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parse a timestamp as RFC 3339, or as a local date-time in the offset of `now`.
pub fn parse_occurred_at(text: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    let text = text.trim();

    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(date_time);
    }

    PrimitiveDateTime::parse(text, LOCAL_DATE_TIME_WITH_SECONDS_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(text, LOCAL_DATE_TIME_FORMAT))
        .ok()
        .map(|date_time| date_time.assume_offset(now.offset()))
}

fn character_count(text: &str) -> usize {
    text.graphemes(true).count()
}
