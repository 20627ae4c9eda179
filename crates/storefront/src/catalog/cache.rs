//! Cache types for content API responses.

use traft_core::ProductId;

use super::types::{Banner, Product};

/// Cache key for banners and products.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Banners,
    HomeProducts,
    Products { page: u32, limit: u32 },
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Banners(Vec<Banner>),
    Products(Vec<Product>),
    Product(Box<Product>),
}
