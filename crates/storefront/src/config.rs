//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TRAFT_UPI_ID` - UPI virtual payment address receiving payments
//! - `TRAFT_ORDER_API_URL` - Base URL of the order API (orders are posted to `{url}/orders`)
//!
//! ## Optional
//! - `TRAFT_PAYEE_NAME` - Name shown in the payment app (default: Traft)
//! - `TRAFT_CONTENT_API_URL` - Base URL of the content API (default: the order API URL)
//! - `TRAFT_ORDER_API_TOKEN` - Bearer token for the order API
//! - `TRAFT_ORDER_TIMEOUT_SECS` - Order submission timeout (default: 10)
//! - `TRAFT_COD_SURCHARGE` - Cash-on-delivery shipping surcharge in rupees (default: 100)
//! - `TRAFT_COD_ADVANCE` - Cash-on-delivery advance in rupees (default: 100)
//! - `TRAFT_CHECKOUT_TTL_MINUTES` - How long a checkout draft stays resumable (default: 60)
//! - `TRAFT_DATA_DIR` - Directory for the file-backed store (default: .traft)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use traft_core::Money;
use url::Url;

use crate::checkout::CheckoutSettings;
use crate::payment_link::DEFAULT_NOTE;
use crate::pricing::PricingPolicy;

const DEFAULT_PAYEE_NAME: &str = "Traft";
const DEFAULT_ORDER_TIMEOUT_SECS: &str = "10";
const DEFAULT_COD_SURCHARGE: &str = "100";
const DEFAULT_COD_ADVANCE: &str = "100";
const DEFAULT_CHECKOUT_TTL_MINUTES: &str = "60";
const DEFAULT_DATA_DIR: &str = ".traft";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Who receives UPI payments
    pub payee: PayeeConfig,
    /// Order API connection settings
    pub order_api: OrderApiConfig,
    /// Content API base URL (always ends in `/`)
    pub content_api_url: Url,
    /// COD surcharge and advance
    pub pricing: PricingPolicy,
    /// Checkout draft time-to-live
    pub checkout_ttl: chrono::Duration,
    /// Directory for the file-backed store
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// UPI payee details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayeeConfig {
    /// UPI virtual payment address (e.g. `traft@okaxis`)
    pub upi_id: String,
    /// Display name in the payment app
    pub name: String,
}

/// Order API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OrderApiConfig {
    /// Base URL (always ends in `/`)
    pub base_url: Url,
    /// Bearer token, if the API requires one
    pub token: Option<SecretString>,
    /// Request timeout for order submission
    pub timeout: Duration,
}

impl std::fmt::Debug for OrderApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let payee = PayeeConfig {
            upi_id: env.required("TRAFT_UPI_ID")?,
            name: env.or_default("TRAFT_PAYEE_NAME", DEFAULT_PAYEE_NAME),
        };

        let order_base = env.required_url("TRAFT_ORDER_API_URL")?;
        let content_api_url = match env.optional("TRAFT_CONTENT_API_URL") {
            Some(raw) => parse_base_url("TRAFT_CONTENT_API_URL", &raw)?,
            None => order_base.clone(),
        };

        let timeout_secs: u64 = env.parsed("TRAFT_ORDER_TIMEOUT_SECS", DEFAULT_ORDER_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(invalid("TRAFT_ORDER_TIMEOUT_SECS", "must be at least 1"));
        }
        let order_api = OrderApiConfig {
            base_url: order_base,
            token: env.optional("TRAFT_ORDER_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        };

        let pricing = PricingPolicy {
            cod_surcharge: env.rupees("TRAFT_COD_SURCHARGE", DEFAULT_COD_SURCHARGE)?,
            cod_advance: env.rupees("TRAFT_COD_ADVANCE", DEFAULT_COD_ADVANCE)?,
        };

        let ttl_minutes: i64 = env.parsed("TRAFT_CHECKOUT_TTL_MINUTES", DEFAULT_CHECKOUT_TTL_MINUTES)?;
        if ttl_minutes <= 0 {
            return Err(invalid("TRAFT_CHECKOUT_TTL_MINUTES", "must be positive"));
        }

        Ok(Self {
            payee,
            order_api,
            content_api_url,
            pricing,
            checkout_ttl: chrono::Duration::minutes(ttl_minutes),
            data_dir: PathBuf::from(env.or_default("TRAFT_DATA_DIR", DEFAULT_DATA_DIR)),
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }

    /// Settings for a [`CheckoutSession`](crate::checkout::CheckoutSession).
    #[must_use]
    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            pricing: self.pricing,
            payee_id: self.payee.upi_id.clone(),
            payee_name: self.payee.name.clone(),
            note: DEFAULT_NOTE.to_string(),
            ttl: self.checkout_ttl,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| invalid(key, &e.to_string()))
    }

    /// Parse a non-negative rupee amount.
    fn rupees(&self, key: &str, default: &str) -> Result<Money, ConfigError> {
        let amount: Decimal = self.parsed(key, default)?;
        if amount.is_sign_negative() {
            return Err(invalid(key, "must not be negative"));
        }
        Ok(Money::from(amount))
    }

    fn required_url(&self, key: &str) -> Result<Url, ConfigError> {
        parse_base_url(key, &self.required(key)?)
    }
}

/// Parse a base URL, adding the trailing slash `Url::join` needs to keep the
/// last path segment.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| invalid(key, &e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(key, "must be an http(s) URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}
