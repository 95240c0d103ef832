//! Password handling for registration and log in.
//!
//! Raw passwords enter the system as a [ValidatedPassword], which only checks
//! length, and are stored as a bcrypt [PasswordHash]. Neither type prints its
//! contents.

use std::fmt;

use bcrypt::BcryptError;
use serde::Deserialize;

use crate::Error;

/// The minimum number of characters in a password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MASK: &str = "********";

/// A password that is long enough to be accepted, but not yet hashed.
///
/// Request bodies deserialize straight into this type, so a short password is
/// rejected by the JSON extractor before a handler runs.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check `raw` against [MIN_PASSWORD_LENGTH].
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidOperation] when the password is too short.
    pub fn new(raw: &str) -> Result<Self, Error> {
        let length = raw.chars().count();

        if length < MIN_PASSWORD_LENGTH {
            return Err(Error::InvalidOperation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        Ok(Self(raw.to_owned()))
    }

    /// Wrap `raw` without checking its length. Used by tests and tooling.
    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.to_owned())
    }

    /// Hash this password with bcrypt at the given `cost`.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if bcrypt rejects the cost or fails.
    pub fn hash(&self, cost: u32) -> Result<PasswordHash, Error> {
        bcrypt::hash(&self.0, cost)
            .map(PasswordHash)
            .map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl TryFrom<String> for ValidatedPassword {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(&raw)
    }
}

impl fmt::Debug for ValidatedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatedPassword({MASK})")
    }
}

impl fmt::Display for ValidatedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

/// A bcrypt hash of a user's password, as stored in the user table.
#[derive(Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The bcrypt cost used by the server unless overridden.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with the given bcrypt `cost`.
    ///
    /// Higher costs make each log in slower. Tests use a cost of 4.
    pub fn new(password: &ValidatedPassword, cost: u32) -> Result<Self, Error> {
        password.hash(cost)
    }

    /// Wrap a hash read back from the database.
    pub fn new_unchecked(stored_hash: &str) -> Self {
        Self(stored_hash.to_owned())
    }

    /// Whether `candidate` is the password this hash was made from.
    pub fn verify(&self, candidate: &str) -> Result<bool, BcryptError> {
        bcrypt::verify(candidate, &self.0)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash({MASK})")
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
