//! Shopper-entered payment transaction reference.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TransactionRef`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionRefError {
    /// Nothing was entered.
    #[error("transaction ID cannot be empty")]
    Empty,
    /// The input is longer than any payment app reference.
    #[error("transaction ID must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The reference a payment app shows after a transfer (UPI UTR or similar).
///
/// Never empty: a checkout cannot reach submission without one, and this
/// type is the only way to carry one into an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a reference, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or too long.
    pub fn parse(s: &str) -> Result<Self, TransactionRefError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TransactionRefError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(TransactionRefError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TransactionRef {
    type Error = TransactionRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TransactionRef> for String {
    fn from(value: TransactionRef) -> Self {
        value.0
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(
            TransactionRef::parse("  412345678901 ").map(|t| t.as_str().to_owned()),
            Ok("412345678901".to_owned())
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(TransactionRef::parse(""), Err(TransactionRefError::Empty));
        assert_eq!(TransactionRef::parse("   "), Err(TransactionRefError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "9".repeat(65);
        assert!(matches!(
            TransactionRef::parse(&long),
            Err(TransactionRefError::TooLong { max: 64 })
        ));
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<TransactionRef>("\"\"").is_err());
        assert!(serde_json::from_str::<TransactionRef>("\"UTR1\"").is_ok());
    }
}
