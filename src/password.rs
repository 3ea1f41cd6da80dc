//! This file defines types that handle password validation and hashing.
//! `ValidatedPassword` wraps a string and ensures it meets the length requirement.
//! `PasswordHash` converts a `ValidatedPassword` into a salted and hashed password.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};

use crate::Error;

/// The minimum number of characters in a password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A password that has been validated, but not yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// # Errors
    ///
    /// Returns [Error::TooWeak] if the password is shorter than [MIN_PASSWORD_LENGTH].
    pub fn new(raw_password_string: &str) -> Result<Self, Error> {
        if raw_password_string.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::TooWeak(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        Ok(Self(raw_password_string.to_owned()))
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed to verify a password.
    /// Pass in [PasswordHash::DEFAULT_COST] to use the recommended cost.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap a hash that was read back from the database.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_owned())
    }

    /// Validate and hash `raw_password` in one go.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        let validated_password = ValidatedPassword::new(raw_password)?;
        PasswordHash::new(validated_password, cost)
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod password_tests {
    use crate::Error;

    use super::{PasswordHash, ValidatedPassword};

    #[test]
    fn rejects_short_password() {
        let result = ValidatedPassword::new("12345");

        assert_eq!(
            result,
            Err(Error::TooWeak(
                "Password must be at least 6 characters long".to_owned()
            ))
        );
    }

    #[test]
    fn accepts_six_characters() {
        assert!(ValidatedPassword::new("123456").is_ok());
    }

    #[test]
    fn display_hides_password() {
        let password = ValidatedPassword::new("hunter22").unwrap();

        assert_eq!(password.to_string(), "********");
    }

    #[test]
    fn hash_verifies_original_password_only() {
        let hash = PasswordHash::from_raw_password("correct horse", 4).unwrap();

        assert!(hash.verify("correct horse").unwrap());
        assert!(!hash.verify("wrong horse").unwrap());
    }
}
