//! The signed monetary amount of a transaction.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The largest magnitude a single transaction may have, one quadrillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// An amount of money.
///
/// Positive values are income, negative values are expenses. The sign is the
/// only thing that distinguishes the two, so it is never inferred from the
/// magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

/// The reasons why text could not be read as a signed [Amount].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountParseError {
    /// The text was empty or only whitespace.
    Empty,
    /// The text did not start with an explicit `+` or `-`.
    MissingSign,
    /// The text after the sign was not a plain decimal number.
    NotANumber,
    /// The number was zero, which does not record any movement of money.
    Zero,
}

impl Amount {
    /// Wrap a decimal value.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse text of the form `+123.45` or `-67`.
    ///
    /// The sign is mandatory and decides the polarity of the result. The text
    /// after the sign must be digits with at most one decimal point.
    ///
    /// # Errors
    ///
    /// Returns an [AmountParseError] describing the first problem found.
    pub fn parse_signed(text: &str) -> Result<Self, AmountParseError> {
        let text = text.trim();

        if text.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (is_negative, magnitude) = if let Some(magnitude) = text.strip_prefix('+') {
            (false, magnitude)
        } else if let Some(magnitude) = text.strip_prefix('-') {
            (true, magnitude)
        } else {
            return Err(AmountParseError::MissingSign);
        };

        if !is_plain_decimal(magnitude) {
            return Err(AmountParseError::NotANumber);
        }

        // Accept ".5" and "5." the way number inputs do.
        let magnitude = magnitude.strip_suffix('.').unwrap_or(magnitude);
        let magnitude = match magnitude.strip_prefix('.') {
            Some(fraction) => Decimal::from_str(&format!("0.{fraction}")),
            None => Decimal::from_str(magnitude),
        }
        .map_err(|_| AmountParseError::NotANumber)?;

        if magnitude.is_zero() {
            return Err(AmountParseError::Zero);
        }

        let value = if is_negative {
            -magnitude.abs()
        } else {
            magnitude.abs()
        };

        Ok(Self(value))
    }

    /// The decimal value of the amount.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the amount records money coming in.
    pub fn is_income(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Whether the amount records money going out.
    pub fn is_expense(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

/// Add up `values`, or `None` if the total does not fit in a [Decimal].
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Digits with at most one decimal point and at least one digit.
fn is_plain_decimal(text: &str) -> bool {
    let mut seen_digit = false;
    let mut seen_point = false;

    for c in text.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }

    seen_digit
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// Stored as text so that the decimal round-trips exactly.
impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Decimal::from_str(text)
            .map(Self)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
