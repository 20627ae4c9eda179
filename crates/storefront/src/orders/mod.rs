//! Order payload and submission to the order API.
//!
//! # Flow
//!
//! 1. [`Order::assemble`] builds the payload from the checkout draft, the
//!    cart and the shopper's transaction reference
//! 2. [`Order::validate`] rejects payloads the API would refuse
//! 3. An [`OrderGateway`] (normally [`HttpOrderClient`]) creates the order
//!
//! Payment is reconciled by hand: staff match the transaction reference
//! against their UPI statement before fulfilling. A retry after an
//! ambiguous failure can therefore create a duplicate order; the draft ID
//! is sent as an idempotency key so the API can collapse those.

mod client;

pub use client::HttpOrderClient;

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use traft_core::{DraftId, OrderId, PaymentMode, ProductId, TransactionRef};

use crate::cart::CartItem;
use crate::checkout::CheckoutDraft;

/// Errors from order submission (`OrderSubmissionFailed`).
#[derive(Debug, Error)]
pub enum OrderSubmissionError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No response within the configured timeout.
    #[error("order API did not respond in time")]
    Timeout,

    /// The payload failed local validation and was not sent.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// The success response could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One ordered product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The create-order request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub customer_name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_id: Option<String>,
    pub address: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub products: Vec<OrderLine>,
    pub payment_mode: PaymentMode,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_charges: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub advance_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cod_remaining: Decimal,
    /// The shopper has reported paying the advance.
    pub payment_status: bool,
    pub transaction_id: String,
}

impl Order {
    /// Build the payload for a checkout attempt.
    ///
    /// Amounts come from the draft's totals snapshot, which is what the
    /// payment link charged.
    #[must_use]
    pub fn assemble(draft: &CheckoutDraft, items: &[CartItem], transaction_ref: &TransactionRef) -> Self {
        let shipping = &draft.shipping;
        let quote = &draft.quote;
        Self {
            customer_name: shipping.customer_name.clone(),
            phone_number: shipping.phone_number.to_string(),
            alternate_phone: shipping.alternate_phone.as_ref().map(ToString::to_string),
            instagram_id: shipping.instagram_id.clone(),
            address: shipping.address.clone(),
            district: shipping.district.clone(),
            state: shipping.state.clone(),
            pincode: shipping.pincode.to_string(),
            landmark: shipping.landmark.clone(),
            products: items
                .iter()
                .map(|item| OrderLine {
                    product: item.product_id.clone(),
                    quantity: item.quantity,
                    size: item.size.clone(),
                    color: item.color.clone(),
                })
                .collect(),
            payment_mode: draft.payment_mode,
            shipping_charges: quote.shipping.amount(),
            total_amount: quote.total.amount(),
            advance_amount: quote.advance_due.amount(),
            cod_remaining: quote.remaining_on_delivery.amount(),
            payment_status: true,
            transaction_id: transaction_ref.to_string(),
        }
    }

    /// Check the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`OrderSubmissionError::InvalidOrder`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), OrderSubmissionError> {
        let invalid = |msg: &str| Err(OrderSubmissionError::InvalidOrder(msg.to_string()));

        if self.products.is_empty() {
            return invalid("order has no products");
        }
        if self.products.iter().any(|line| line.quantity == 0) {
            return invalid("every product needs a quantity of at least 1");
        }
        if self.transaction_id.trim().is_empty() {
            return invalid("transaction ID is required");
        }
        if self.total_amount <= Decimal::ZERO {
            return invalid("total amount must be positive");
        }
        if self.advance_amount + self.cod_remaining != self.total_amount {
            return invalid("advance and balance do not add up to the total");
        }
        match self.payment_mode {
            PaymentMode::Online if !self.cod_remaining.is_zero() => {
                invalid("prepaid orders cannot carry a delivery balance")
            }
            _ => Ok(()),
        }
    }
}

/// Successful create-order response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_id: OrderId,
}

/// Something that can create orders.
///
/// Implemented by [`HttpOrderClient`]; tests supply scripted fakes.
pub trait OrderGateway: Send + Sync {
    /// Create an order.
    ///
    /// `idempotency_key` is the same for every retry of one checkout draft.
    fn create_order(
        &self,
        order: &Order,
        idempotency_key: DraftId,
    ) -> impl Future<Output = Result<OrderId, OrderSubmissionError>> + Send;
}
