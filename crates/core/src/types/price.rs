//! Monetary amounts using decimal arithmetic.
//!
//! The store only sells in Indian rupees, so [`Money`] carries the amount
//! alone and [`CurrencyCode`] exists for payment links and display.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// A non-negative amount in rupees.
///
/// Serialized as a decimal string so persisted carts round-trip exactly.
/// Deserializing accepts a string or a JSON number and rejects negative
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    ///
    /// Negative inputs are clamped to zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO))
    }

    /// Create an amount from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Subtract, clamping at zero instead of going negative.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }

    /// Round to paise (two decimal places) and strip trailing zeros.
    ///
    /// `1100.00` becomes `1100`, `99.50` becomes `99.5`.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string()
    }

    /// Format for display with the rupee sign, e.g. `₹1100`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", CurrencyCode::INR.symbol(), self.to_plain_string())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        if amount < Decimal::ZERO {
            return Err(serde::de::Error::custom(format!(
                "amount cannot be negative: {amount}"
            )));
        }
        Ok(Self(amount))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amounts_clamp_to_zero() {
        assert_eq!(Money::new(Decimal::new(-5, 0)), Money::ZERO);
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_rupees(100);
        let b = Money::from_rupees(250);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_rupees(150));
    }

    #[test]
    fn test_plain_string_strips_trailing_zeros() {
        assert_eq!(Money::new(Decimal::new(110_000, 2)).to_plain_string(), "1100");
        assert_eq!(Money::new(Decimal::new(9950, 2)).to_plain_string(), "99.5");
        assert_eq!(Money::new(Decimal::new(10_005, 3)).to_plain_string(), "10.01");
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_rupees(500).to_string(), "₹500");
    }

    #[test]
    fn test_mul_and_sum() {
        let line = Money::from_rupees(500) * 2;
        let total: Money = [line, Money::from_rupees(100)].into_iter().sum();
        assert_eq!(total, Money::from_rupees(1100));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Money>("-250").is_err());
        assert!(serde_json::from_str::<Money>("\"-0.5\"").is_err());
    }

    #[test]
    fn test_deserialize_number_or_string() {
        assert_eq!(serde_json::from_str::<Money>("1499").ok(), Some(Money::from_rupees(1499)));
        assert_eq!(serde_json::from_str::<Money>("\"75\"").ok(), Some(Money::from_rupees(75)));
        assert_eq!(serde_json::from_str::<Money>("0").ok(), Some(Money::ZERO));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_rupees(75)).unwrap_or_default();
        assert_eq!(json, "\"75\"");
    }
}
