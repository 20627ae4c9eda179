//! Persisted checkout records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use traft_core::{CheckoutStep, DraftId, PaymentMode};

use super::form::ShippingDetails;
use crate::pricing::Quote;

/// Default lifetime of a draft, measured from its creation.
pub const DEFAULT_TTL: Duration = Duration::hours(1);

/// An order the shopper has filled in but not yet submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub id: DraftId,
    pub shipping: ShippingDetails,
    pub payment_mode: PaymentMode,
    /// Totals at the moment the shipping form was submitted.
    pub quote: Quote,
    pub created_at: DateTime<Utc>,
}

impl CheckoutDraft {
    /// How long ago the draft was created.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Returns `true` once the draft is at least `ttl` old.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }
}

/// Which step the shopper was on, saved on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionState {
    pub step: CheckoutStep,
    /// As typed; may be empty while waiting for payment.
    #[serde(default)]
    pub transaction_ref: String,
    pub payment_mode: PaymentMode,
    pub updated_at: DateTime<Utc>,
}
