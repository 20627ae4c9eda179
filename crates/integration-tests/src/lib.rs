//! Integration test support for the Traft storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p traft-integration-tests
//! ```
//!
//! No external services are needed: the order and content APIs are played
//! by `axum` routers bound to `127.0.0.1:0`, and persisted state goes to a
//! temporary directory.
//!
//! # Test Categories
//!
//! - `order_client` - `HttpOrderClient` against a stub order API
//! - `catalog_client` - `CatalogClient` responses and caching
//! - `checkout_flow` - cart to placed order across simulated restarts

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::http::HeaderMap;
use secrecy::SecretString;
use traft_core::{Money, ProductId};
use traft_storefront::cart::CartProduct;
use traft_storefront::checkout::ShippingForm;
use traft_storefront::config::OrderApiConfig;
use url::Url;

/// Start `router` on an ephemeral local port and return its base URL.
///
/// The server runs until the test's runtime shuts down.
pub async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Stub server has no address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Stub server failed");
    });

    Url::parse(&format!("http://{addr}/")).expect("Invalid stub server URL")
}

/// A request seen by a stub handler.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl Recorded {
    /// A header's value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Shared log of requests, cloned into handler state.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn push(&self, path: impl Into<String>, headers: HeaderMap, body: serde_json::Value) {
        self.lock().push(Recorded {
            path: path.into(),
            headers,
            body,
        });
    }

    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Order API settings pointing at `base_url`.
#[must_use]
pub fn order_api(base_url: Url, timeout: Duration) -> OrderApiConfig {
    OrderApiConfig {
        base_url,
        token: Some(SecretString::from("tok_test_Qm9wZXJh")),
        timeout,
    }
}

/// A product as the cart sees it.
#[must_use]
pub fn product(id: &str, name: &str, rupees: u32, stock: u32, sizes: &[&str]) -> CartProduct {
    CartProduct {
        id: ProductId::new(id),
        name: name.to_string(),
        unit_price: Money::from_rupees(rupees),
        max_qty: stock,
        sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
        colors: Vec::new(),
        image: None,
    }
}

/// A shipping form that passes validation.
#[must_use]
pub fn shipping_form() -> ShippingForm {
    ShippingForm {
        customer_name: "Meera Nair".to_string(),
        phone_number: "+91 98470 12345".to_string(),
        alternate_phone: String::new(),
        instagram_id: "@meera.weaves".to_string(),
        address: "TC 14/220, Vazhuthacaud".to_string(),
        district: "Thiruvananthapuram".to_string(),
        state: "Kerala".to_string(),
        pincode: "695014".to_string(),
        landmark: "Opp. Women's College".to_string(),
    }
}
