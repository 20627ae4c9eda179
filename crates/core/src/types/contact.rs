//! Validated contact fields for shipping details.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, dashes or a leading +.
    #[error("phone number may only contain digits")]
    InvalidCharacter,
    /// The number does not have ten significant digits.
    #[error("phone number must have 10 digits")]
    InvalidLength,
    /// The first significant digit is not a mobile prefix.
    #[error("phone number must start with 6, 7, 8 or 9")]
    InvalidPrefix,
}

/// An Indian mobile number, stored as its ten significant digits.
///
/// ## Accepted input
///
/// - Ten digits starting with 6-9
/// - Optionally prefixed by `+91`, `91` or a trunk `0`
/// - Spaces and dashes are ignored
///
/// ## Examples
///
/// ```
/// use traft_core::PhoneNumber;
///
/// assert_eq!(PhoneNumber::parse("98765 43210").unwrap().as_str(), "9876543210");
/// assert_eq!(PhoneNumber::parse("+91-9876543210").unwrap().as_str(), "9876543210");
/// assert!(PhoneNumber::parse("12345").is_err());
/// assert!(PhoneNumber::parse("5876543210").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of significant digits in a mobile number.
    pub const DIGITS: usize = 10;

    /// Parse a `PhoneNumber` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains non-digit characters,
    /// does not reduce to ten digits, or does not start with 6-9.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let mut digits = String::with_capacity(without_plus.len());
        for c in without_plus.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(PhoneNumberError::InvalidCharacter),
            }
        }

        let significant = match digits.len() {
            Self::DIGITS => digits.as_str(),
            11 => digits
                .strip_prefix('0')
                .ok_or(PhoneNumberError::InvalidLength)?,
            12 => digits
                .strip_prefix("91")
                .ok_or(PhoneNumberError::InvalidLength)?,
            _ => return Err(PhoneNumberError::InvalidLength),
        };

        if !significant.starts_with(['6', '7', '8', '9']) {
            return Err(PhoneNumberError::InvalidPrefix);
        }

        Ok(Self(significant.to_owned()))
    }

    /// Returns the ten-digit number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors that can occur when parsing a [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PincodeError {
    /// The input string is empty.
    #[error("pincode cannot be empty")]
    Empty,
    /// The input is not exactly six digits.
    #[error("pincode must be exactly 6 digits")]
    InvalidFormat,
    /// Postal codes never start with 0.
    #[error("pincode cannot start with 0")]
    LeadingZero,
}

/// A six-digit Indian postal index number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Pincode(String);

impl Pincode {
    /// Length of a pincode.
    pub const LENGTH: usize = 6;

    /// Parse a `Pincode` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is six ASCII digits not
    /// starting with zero.
    pub fn parse(s: &str) -> Result<Self, PincodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PincodeError::Empty);
        }
        if trimmed.len() != Self::LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PincodeError::InvalidFormat);
        }
        if trimmed.starts_with('0') {
            return Err(PincodeError::LeadingZero);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the pincode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pincode {
    type Error = PincodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pincode> for String {
    fn from(value: Pincode) -> Self {
        value.0
    }
}

impl std::str::FromStr for Pincode {
    type Err = PincodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_mobile() {
        assert_eq!(PhoneNumber::parse("9876543210").unwrap().as_str(), "9876543210");
    }

    #[test]
    fn test_parse_prefixed_mobile() {
        assert_eq!(PhoneNumber::parse("+919876543210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse("919876543210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse("09876543210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse(" 98765-43210 ").unwrap().as_str(), "9876543210");
    }

    #[test]
    fn test_parse_phone_errors() {
        assert_eq!(PhoneNumber::parse("  "), Err(PhoneNumberError::Empty));
        assert_eq!(
            PhoneNumber::parse("98765x3210"),
            Err(PhoneNumberError::InvalidCharacter)
        );
        assert_eq!(
            PhoneNumber::parse("98765432"),
            Err(PhoneNumberError::InvalidLength)
        );
        assert_eq!(
            PhoneNumber::parse("19876543210"),
            Err(PhoneNumberError::InvalidLength)
        );
        assert_eq!(
            PhoneNumber::parse("1234567890"),
            Err(PhoneNumberError::InvalidPrefix)
        );
    }

    #[test]
    fn test_parse_pincode() {
        assert_eq!(Pincode::parse(" 682001 ").unwrap().as_str(), "682001");
        assert_eq!(Pincode::parse(""), Err(PincodeError::Empty));
        assert_eq!(Pincode::parse("68200"), Err(PincodeError::InvalidFormat));
        assert_eq!(Pincode::parse("68200a"), Err(PincodeError::InvalidFormat));
        assert_eq!(Pincode::parse("082001"), Err(PincodeError::LeadingZero));
    }

    #[test]
    fn test_deserialize_validates() {
        let phone: PhoneNumber = serde_json::from_str("\"9847012345\"").unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"9847012345\"");
        assert!(serde_json::from_str::<PhoneNumber>("\"12345\"").is_err());

        let pincode: Pincode = serde_json::from_str("\"695014\"").unwrap();
        assert_eq!(pincode.as_str(), "695014");
        assert!(serde_json::from_str::<Pincode>("\"000000\"").is_err());
    }
}
