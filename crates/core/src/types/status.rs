//! Status enums for checkout and orders.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How the shopper pays for an order.
///
/// Serialized with the order API's wire names (`online`, `cod`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Full amount paid up front via UPI.
    #[default]
    Online,
    /// Fixed advance via UPI, balance collected at delivery.
    Cod,
}

impl PaymentMode {
    /// Wire name used by the order API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Cod => "cod",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online => "Online (Full Payment)",
            Self::Cod => "Cash on Delivery",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown payment mode.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown payment mode '{0}' (expected 'online' or 'cod')")]
pub struct ParsePaymentModeError(pub String);

impl std::str::FromStr for PaymentMode {
    type Err = ParsePaymentModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "prepaid" => Ok(Self::Online),
            "cod" | "cash-on-delivery" | "cash_on_delivery" => Ok(Self::Cod),
            _ => Err(ParsePaymentModeError(s.to_owned())),
        }
    }
}

/// The persisted step of an in-progress checkout.
///
/// Only the two resumable steps are ever written to storage; submission
/// outcomes are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutStep {
    #[default]
    CollectingInfo,
    AwaitingPayment,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollectingInfo => f.write_str("collecting-info"),
            Self::AwaitingPayment => f.write_str("awaiting-payment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMode::Cod).unwrap_or_default(),
            "\"cod\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMode::Online).unwrap_or_default(),
            "\"online\""
        );
    }

    #[test]
    fn test_payment_mode_from_str() {
        assert_eq!("COD".parse::<PaymentMode>(), Ok(PaymentMode::Cod));
        assert_eq!(
            "cash-on-delivery".parse::<PaymentMode>(),
            Ok(PaymentMode::Cod)
        );
        assert_eq!("online".parse::<PaymentMode>(), Ok(PaymentMode::Online));
        assert!("card".parse::<PaymentMode>().is_err());
    }

    #[test]
    fn test_checkout_step_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CheckoutStep::AwaitingPayment).unwrap_or_default(),
            "\"awaiting-payment\""
        );
        assert_eq!(CheckoutStep::CollectingInfo.to_string(), "collecting-info");
    }
}
