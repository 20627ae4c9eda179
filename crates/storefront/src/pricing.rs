//! Order totals for each payment mode.
//!
//! All rules live in [`PricingPolicy`] so the surcharge and advance can be
//! re-tuned from configuration without touching the checkout flow.

use serde::{Deserialize, Serialize};
use traft_core::{Money, PaymentMode};

use crate::cart::CartItem;

/// Delivery estimate shown for prepaid orders.
pub const ONLINE_DELIVERY_ESTIMATE: &str = "Kerala: 2-3 days | Outside Kerala: 6-7 days";

/// Delivery estimate shown for cash-on-delivery orders.
pub const COD_DELIVERY_ESTIMATE: &str = "Delivery in 7 days";

/// Surcharge and advance rules per payment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Added to the subtotal for cash-on-delivery orders.
    pub cod_surcharge: Money,
    /// Paid up front for cash-on-delivery orders.
    pub cod_advance: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            cod_surcharge: Money::from_rupees(100),
            cod_advance: Money::from_rupees(100),
        }
    }
}

/// Sum of `unit_price × quantity` over all items.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// Shipping time shown next to the totals.
#[must_use]
pub const fn delivery_estimate(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Online => ONLINE_DELIVERY_ESTIMATE,
        PaymentMode::Cod => COD_DELIVERY_ESTIMATE,
    }
}

impl PricingPolicy {
    /// Shipping surcharge for a payment mode.
    #[must_use]
    pub const fn shipping_surcharge(&self, mode: PaymentMode) -> Money {
        match mode {
            PaymentMode::Online => Money::ZERO,
            PaymentMode::Cod => self.cod_surcharge,
        }
    }

    /// `subtotal + shipping_surcharge`.
    #[must_use]
    pub fn total(&self, items: &[CartItem], mode: PaymentMode) -> Money {
        subtotal(items) + self.shipping_surcharge(mode)
    }

    /// Amount collected now through the payment link.
    ///
    /// Never exceeds `total`.
    #[must_use]
    pub fn advance_due(&self, total: Money, mode: PaymentMode) -> Money {
        match mode {
            PaymentMode::Online => total,
            PaymentMode::Cod => self.cod_advance.min(total),
        }
    }

    /// Amount collected at the door; never negative.
    #[must_use]
    pub fn remaining_on_delivery(total: Money, advance_due: Money, mode: PaymentMode) -> Money {
        match mode {
            PaymentMode::Online => Money::ZERO,
            PaymentMode::Cod => total.saturating_sub(advance_due),
        }
    }

    /// Compute every figure for a cart and payment mode.
    #[must_use]
    pub fn quote(&self, items: &[CartItem], mode: PaymentMode) -> Quote {
        let subtotal = subtotal(items);
        let shipping = self.shipping_surcharge(mode);
        let total = subtotal + shipping;
        let advance_due = self.advance_due(total, mode);
        Quote {
            payment_mode: mode,
            subtotal,
            shipping,
            total,
            advance_due,
            remaining_on_delivery: Self::remaining_on_delivery(total, advance_due, mode),
        }
    }
}

/// A snapshot of the order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub payment_mode: PaymentMode,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub advance_due: Money,
    pub remaining_on_delivery: Money,
}

impl Quote {
    /// Shipping time for this quote's payment mode.
    #[must_use]
    pub const fn delivery_estimate(&self) -> &'static str {
        delivery_estimate(self.payment_mode)
    }
}

#[cfg(test)]
mod tests {
    use traft_core::ProductId;

    use super::*;

    fn item(price: u32, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(format!("p-{price}")),
            name: "Item".to_string(),
            unit_price: Money::from_rupees(price),
            quantity,
            max_qty: 10,
            size: None,
            color: None,
            image: None,
        }
    }

    #[test]
    fn test_online_scenario() {
        let quote = PricingPolicy::default().quote(&[item(500, 2)], PaymentMode::Online);
        assert_eq!(quote.subtotal, Money::from_rupees(1000));
        assert_eq!(quote.shipping, Money::ZERO);
        assert_eq!(quote.total, Money::from_rupees(1000));
        assert_eq!(quote.advance_due, Money::from_rupees(1000));
        assert_eq!(quote.remaining_on_delivery, Money::ZERO);
    }

    #[test]
    fn test_cod_scenario() {
        let quote = PricingPolicy::default().quote(&[item(500, 2)], PaymentMode::Cod);
        assert_eq!(quote.subtotal, Money::from_rupees(1000));
        assert_eq!(quote.shipping, Money::from_rupees(100));
        assert_eq!(quote.total, Money::from_rupees(1100));
        assert_eq!(quote.advance_due, Money::from_rupees(100));
        assert_eq!(quote.remaining_on_delivery, Money::from_rupees(1000));
    }

    #[test]
    fn test_total_is_subtotal_plus_surcharge() {
        let policy = PricingPolicy::default();
        let carts = [
            vec![item(1, 1)],
            vec![item(500, 2), item(799, 1)],
            vec![item(250, 4), item(99, 3), item(1200, 1)],
        ];
        for items in &carts {
            for mode in [PaymentMode::Online, PaymentMode::Cod] {
                assert_eq!(
                    policy.total(items, mode),
                    subtotal(items) + policy.shipping_surcharge(mode)
                );
            }
        }
    }

    #[test]
    fn test_advance_never_exceeds_total() {
        let policy = PricingPolicy {
            cod_surcharge: Money::ZERO,
            cod_advance: Money::from_rupees(100),
        };
        let quote = policy.quote(&[item(40, 1)], PaymentMode::Cod);
        assert_eq!(quote.advance_due, Money::from_rupees(40));
        assert_eq!(quote.remaining_on_delivery, Money::ZERO);
    }

    #[test]
    fn test_remaining_clamped_at_zero() {
        let remaining = PricingPolicy::remaining_on_delivery(
            Money::from_rupees(50),
            Money::from_rupees(100),
            PaymentMode::Cod,
        );
        assert_eq!(remaining, Money::ZERO);
    }

    #[test]
    fn test_delivery_estimates() {
        assert_eq!(delivery_estimate(PaymentMode::Online), ONLINE_DELIVERY_ESTIMATE);
        let quote = PricingPolicy::default().quote(&[item(10, 1)], PaymentMode::Cod);
        assert_eq!(quote.delivery_estimate(), COD_DELIVERY_ESTIMATE);
    }

    #[test]
    fn test_empty_cart_subtotal() {
        assert_eq!(subtotal(&[]), Money::ZERO);
    }
}
