//! Content API response types.

use serde::{Deserialize, Deserializer, Serialize};
use traft_core::{Money, ProductId};

use crate::cart::CartProduct;

/// A hero banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub cta_link: Option<String>,
}

impl Banner {
    /// A banner with nothing to show.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.title.is_none() && self.image_url.is_none()
    }
}

/// The banner endpoint answers with a list, a single banner, or `{}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum BannerPayload {
    Many(Vec<Banner>),
    One(Banner),
}

impl BannerPayload {
    pub(super) fn into_banners(self) -> Vec<Banner> {
        let banners = match self {
            Self::Many(banners) => banners,
            Self::One(banner) => vec![banner],
        };
        banners.into_iter().filter(|b| !b.is_blank()).collect()
    }
}

/// A product as listed or shown on its detail page.
///
/// Listing endpoints return summaries: `image` is set but sizes, colors and
/// stock are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    /// List price.
    pub price: Money,
    /// Discounted price; zero or absent when not on sale.
    #[serde(default)]
    pub sales_price: Option<Money>,
    #[serde(default)]
    pub rating: Option<rust_decimal::Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sizes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub colors: Vec<String>,
    /// Units in stock; the most one shopper can buy.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
}

impl Product {
    /// The price the shopper pays.
    #[must_use]
    pub fn sale_price(&self) -> Money {
        self.sales_price
            .filter(Money::is_positive)
            .unwrap_or(self.price)
    }

    /// Returns `true` if the sale price is below the list price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.sale_price() < self.price
    }

    /// First image, from either the summary or the gallery.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image
            .as_deref()
            .or_else(|| self.images.first().map(String::as_str))
    }
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.sale_price(),
            max_qty: product.quantity,
            sizes: product.sizes.clone(),
            colors: product.colors.clone(),
            image: product.primary_image().map(str::to_owned),
        }
    }
}

/// A product category tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub slug: String,
}

impl Category {
    /// Path of the category's listing page.
    #[must_use]
    pub fn listing_path(&self) -> String {
        format!(
            "/products?category={}",
            urlencoding::encode(&self.slug.to_lowercase())
        )
    }
}

/// `{ success, data, message }` wrapper used by the product endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

const fn default_success() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_summary() {
        let json = r#"{
            "_id": "p1",
            "name": "Kasavu Tee",
            "rating": 4.5,
            "image": "https://cdn.traft.in/p1.jpg",
            "price": 799,
            "salesPrice": 499,
            "featured": true
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.sale_price(), Money::from_rupees(499));
        assert!(product.is_discounted());
        assert!(product.sizes.is_empty());
        assert_eq!(product.quantity, 0);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let json = r#"{ "_id": "p3", "name": "Broken", "price": -499 }"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }

    #[test]
    fn test_product_detail_with_nulls() {
        let json = r#"{
            "_id": "p2",
            "name": "Mundu",
            "images": ["https://cdn.traft.in/a.jpg", "https://cdn.traft.in/b.jpg"],
            "price": 1200,
            "salesPrice": null,
            "sizes": ["S", "M"],
            "colors": null,
            "features": null,
            "quantity": 3,
            "category": "Ethnic"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.sale_price(), Money::from_rupees(1200));
        assert!(!product.is_discounted());
        assert!(product.colors.is_empty());
        assert_eq!(product.primary_image(), Some("https://cdn.traft.in/a.jpg"));

        let cart_product = CartProduct::from(&product);
        assert_eq!(cart_product.max_qty, 3);
        assert_eq!(cart_product.sizes, vec!["S", "M"]);
        assert_eq!(cart_product.image.as_deref(), Some("https://cdn.traft.in/a.jpg"));
    }

    #[test]
    fn test_zero_sales_price_falls_back_to_price() {
        let json = r#"{"_id": "p3", "name": "Tote", "price": 350, "salesPrice": 0}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.sale_price(), Money::from_rupees(350));
    }

    #[test]
    fn test_banner_payload_shapes() {
        let many: BannerPayload = serde_json::from_str(
            r#"[{"title": "Onam Sale", "imageUrl": "https://cdn.traft.in/onam.jpg", "ctaText": "Shop", "ctaLink": "/products"}]"#,
        )
        .unwrap();
        let banners = many.into_banners();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].cta_link.as_deref(), Some("/products"));

        let one: BannerPayload = serde_json::from_str(r#"{"title": "New in"}"#).unwrap();
        assert_eq!(one.into_banners().len(), 1);

        let empty: BannerPayload = serde_json::from_str("{}").unwrap();
        assert!(empty.into_banners().is_empty());
    }

    #[test]
    fn test_category_listing_path() {
        let category = Category {
            name: "Sarees".to_string(),
            image: None,
            slug: "Kerala Sarees".to_string(),
        };
        assert_eq!(category.listing_path(), "/products?category=kerala%20sarees");
    }
}
