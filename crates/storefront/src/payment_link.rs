//! UPI payment deep links.
//!
//! Builds `upi://pay` URIs that open the shopper's payment app with the
//! payee, amount and note filled in. Every dynamic segment is
//! percent-encoded, so a payee name like `Traft & Co` cannot break the
//! query string.

use std::fmt;

use thiserror::Error;
use traft_core::{CurrencyCode, Money};

/// Note attached to every checkout payment.
pub const DEFAULT_NOTE: &str = "Payment for order";

/// Errors building a payment link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentLinkError {
    /// The amount is zero.
    #[error("payment amount must be positive")]
    NonPositiveAmount,

    /// No payee UPI ID was configured.
    #[error("payee UPI ID cannot be empty")]
    MissingPayee,
}

/// A ready-to-open `upi://pay` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    uri: String,
    amount: Money,
}

impl PaymentLink {
    /// The full URI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// The amount encoded in the link.
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }
}

impl fmt::Display for PaymentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Build a UPI deep link.
///
/// The amount is written with at most two decimal places and no trailing
/// zeros (`1100`, `99.5`).
///
/// # Errors
///
/// Returns an error if `amount` is zero or `payee_id` is blank.
///
/// # Example
///
/// ```
/// use traft_core::Money;
/// use traft_storefront::payment_link::build_link;
///
/// let link = build_link(Money::from_rupees(100), "traft@upi", "Traft & Co", "Payment for order").unwrap();
/// assert_eq!(
///     link.as_str(),
///     "upi://pay?pa=traft%40upi&pn=Traft%20%26%20Co&am=100&tn=Payment%20for%20order&cu=INR"
/// );
/// ```
pub fn build_link(
    amount: Money,
    payee_id: &str,
    payee_name: &str,
    note: &str,
) -> Result<PaymentLink, PaymentLinkError> {
    if !amount.is_positive() {
        return Err(PaymentLinkError::NonPositiveAmount);
    }
    let payee_id = payee_id.trim();
    if payee_id.is_empty() {
        return Err(PaymentLinkError::MissingPayee);
    }

    let uri = format!(
        "upi://pay?pa={}&pn={}&am={}&tn={}&cu={}",
        urlencoding::encode(payee_id),
        urlencoding::encode(payee_name.trim()),
        amount.to_plain_string(),
        urlencoding::encode(note),
        CurrencyCode::INR.code(),
    );

    Ok(PaymentLink { uri, amount })
}
