//! Read-only client for the content API.
//!
//! Banners and products are cached for 5 minutes, categories for 10, using
//! `moka`. The client never writes.

mod cache;
mod types;

pub use types::{Banner, Category, Product};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use traft_core::ProductId;
use url::Url;

use cache::{CacheKey, CacheValue};
use types::{BannerPayload, Envelope};

/// Number of featured products on the home page.
pub const HOME_PRODUCT_COUNT: usize = 4;

const PRODUCT_TTL: Duration = Duration::from_secs(300);
const CATEGORY_TTL: Duration = Duration::from_secs(600);

/// Errors from the content API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the content API.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
    categories: Cache<(), Vec<Category>>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(PRODUCT_TTL)
            .build();
        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATEGORY_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::builder().build()?,
                base_url,
                cache,
                categories,
            }),
        })
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.categories.invalidate_all();
    }

    /// GET `path` (relative to the base URL) and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| CatalogError::Parse(format!("Invalid URL for {path}: {e}")))?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Content API returned non-success status"
            );
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse content API response"
            );
            CatalogError::Parse(e.to_string())
        })
    }

    /// GET a `{ success, data }` wrapped resource.
    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let envelope: Envelope<T> = self.get_json(path).await?;
        match envelope {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { success: true, .. } => Err(CatalogError::NotFound(path.to_string())),
            Envelope { message, .. } => Err(CatalogError::Api {
                status: 200,
                message: message.unwrap_or_else(|| "request failed".to_string()),
            }),
        }
    }

    // =========================================================================
    // Banner Methods
    // =========================================================================

    /// Active hero banners.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn banners(&self) -> Result<Vec<Banner>, CatalogError> {
        if let Some(CacheValue::Banners(banners)) = self.inner.cache.get(&CacheKey::Banners).await {
            debug!("Cache hit for banners");
            return Ok(banners);
        }

        let payload: BannerPayload = self.get_json("api/banner").await?;
        let banners = payload.into_banners();

        self.inner
            .cache
            .insert(CacheKey::Banners, CacheValue::Banners(banners.clone()))
            .await;

        Ok(banners)
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Featured products for the home page (at most [`HOME_PRODUCT_COUNT`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn home_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::HomeProducts).await
        {
            debug!("Cache hit for home products");
            return Ok(products);
        }

        let mut products: Vec<Product> = self.get_data("api/product/home?home=true").await?;
        products.truncate(HOME_PRODUCT_COUNT);

        self.inner
            .cache
            .insert(CacheKey::HomeProducts, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// A page of products. `page` starts at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, page: u32, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let cache_key = CacheKey::Products { page, limit };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .get_data(&format!("api/product/home?page={page}&limit={limit}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// A product's full details.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown ID, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("api/product/{}", urlencoding::encode(id.as_str()));
        let product: Product = self.get_data(&path).await.map_err(|e| match e {
            CatalogError::NotFound(_) => CatalogError::NotFound(format!("Product not found: {id}")),
            other => other,
        })?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// All product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(categories) = self.inner.categories.get(&()).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.get_json("api/categories").await?;

        self.inner.categories.insert((), categories.clone()).await;

        Ok(categories)
    }
}
