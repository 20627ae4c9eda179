//! Unified error handling with Sentry integration.
//!
//! Each component has its own error enum; [`Error`] wraps them for callers
//! that drive several components, such as the CLI.

use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::orders::OrderSubmissionError;
use crate::payment_link::PaymentLinkError;
use crate::storage::StorageError;

/// Any storefront error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading or writing persisted state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A cart operation was rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The payment link could not be built.
    #[error(transparent)]
    PaymentLink(#[from] PaymentLinkError),

    /// A checkout transition was rejected.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The order API call failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderSubmissionError),

    /// The content API call failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl Error {
    /// Returns `true` for failures the shopper cannot fix by changing input.
    ///
    /// These are the ones worth reporting to Sentry.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Config(_) => true,
            Self::Cart(e) => matches!(e, CartError::Storage(_)),
            Self::Checkout(e) => matches!(e, CheckoutError::Storage(_) | CheckoutError::Submission(_)),
            Self::Order(e) => !matches!(e, OrderSubmissionError::InvalidOrder(_)),
            Self::Catalog(e) => !matches!(e, CatalogError::NotFound(_)),
            Self::PaymentLink(_) => false,
        }
    }

    /// Log the error, capturing internal failures to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::info!(error = %self, "Command rejected");
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::VariantAttribute;

    #[test]
    fn test_error_display() {
        let err = Error::from(CartError::VariantRequired(VariantAttribute::Size));
        assert_eq!(err.to_string(), CartError::VariantRequired(VariantAttribute::Size).to_string());

        let err = Error::from(ConfigError::MissingEnvVar("TRAFT_UPI_ID".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: TRAFT_UPI_ID"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(!Error::from(CheckoutError::EmptyCart).is_internal());
        assert!(!Error::from(PaymentLinkError::NonPositiveAmount).is_internal());
        assert!(Error::from(OrderSubmissionError::Timeout).is_internal());
        assert!(
            !Error::from(OrderSubmissionError::InvalidOrder("no products".to_string()))
                .is_internal()
        );
        assert!(!Error::from(CatalogError::NotFound("p1".to_string())).is_internal());
    }

    #[test]
    fn test_add_breadcrumb_without_client() {
        // No Sentry client bound: must be a no-op.
        add_breadcrumb("checkout", "Proceeded to payment", Some(&[("payment_mode", "cod")]));
        add_breadcrumb("cart", "Cleared", None);
    }
}
