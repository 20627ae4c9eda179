//! Command implementations.
//!
//! Every command opens the file-backed store in `TRAFT_DATA_DIR`, so cart
//! and checkout state carry over between invocations.

pub mod cart;
pub mod catalog;
pub mod checkout;

use traft_storefront::cart::CartStore;
use traft_storefront::catalog::CatalogClient;
use traft_storefront::checkout::CheckoutSession;
use traft_storefront::config::StorefrontConfig;
use traft_storefront::error::Result;
use traft_storefront::orders::HttpOrderClient;
use traft_storefront::storage::FileStore;

/// Shared state for one CLI invocation.
pub struct Context {
    config: StorefrontConfig,
    store: FileStore,
}

impl Context {
    /// Open the data directory named in `config`.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let store = FileStore::open(&config.data_dir)?;
        tracing::debug!(dir = %store.dir().display(), "Opened data directory");
        Ok(Self { config, store })
    }

    pub fn cart(&self) -> Result<CartStore<FileStore>> {
        Ok(CartStore::load(self.store.clone())?)
    }

    /// Resume (or start) the checkout session.
    pub fn session(&self) -> CheckoutSession<FileStore> {
        CheckoutSession::restore(
            self.store.clone(),
            traft_storefront::clock::SystemClock,
            self.config.checkout_settings(),
        )
    }

    pub fn catalog(&self) -> Result<CatalogClient> {
        Ok(CatalogClient::new(self.config.content_api_url.clone())?)
    }

    pub fn orders(&self) -> Result<HttpOrderClient> {
        Ok(HttpOrderClient::new(&self.config.order_api)?)
    }
}
