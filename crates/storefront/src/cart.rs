//! Shopper cart persisted in the session store.
//!
//! The cart is the only record of what the shopper intends to buy. It is
//! kept under [`keys::CART`] and never expires; it is cleared when an order
//! is placed or the shopper empties it.
//!
//! # Invariants
//!
//! - At most one [`CartItem`] per (product, size, color)
//! - `1 <= quantity <= max_qty` for every item
//! - Storage is written before observers are told about a change, and a
//!   failed write leaves the in-memory cart untouched

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use traft_core::{Money, ProductId};

use crate::storage::{KeyValueStore, StorageError, keys, load_json, save_json};

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Adding would take the item past the available stock.
    #[error("only {max} of '{name}' available")]
    QuantityLimitExceeded { name: String, max: u32 },

    /// The product needs a size or color choice first.
    #[error("please select a {0} before adding to cart")]
    VariantRequired(VariantAttribute),

    /// The chosen size or color is not offered for the product.
    #[error("{attribute} '{value}' is not available for this product")]
    UnknownVariant {
        attribute: VariantAttribute,
        value: String,
    },

    /// The product has no stock at all.
    #[error("'{0}' is out of stock")]
    OutOfStock(String),

    /// The referenced line is not in the cart.
    #[error("item is not in the cart")]
    NotInCart,

    /// Persisting the cart failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A selectable product attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantAttribute {
    Size,
    Color,
}

impl fmt::Display for VariantAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => f.write_str("size"),
            Self::Color => f.write_str("color"),
        }
    }
}

/// The shopper's size/color selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl Variant {
    /// A selection with neither size nor color.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            size: None,
            color: None,
        }
    }

    /// Build a selection, treating blank strings as "not selected".
    #[must_use]
    pub fn new(size: Option<&str>, color: Option<&str>) -> Self {
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            size: clean(size),
            color: clean(color),
        }
    }
}

/// The product data the cart needs to add an item.
///
/// A snapshot taken from the catalog when the shopper presses "add".
#[derive(Debug, Clone, PartialEq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    /// Price actually charged (the sale price when there is one).
    pub unit_price: Money,
    /// Units in stock.
    pub max_qty: u32,
    /// Offered sizes; non-empty means a size must be chosen.
    pub sizes: Vec<String>,
    /// Offered colors; non-empty means a color must be chosen.
    pub colors: Vec<String>,
    pub image: Option<String>,
}

/// One product variant in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub max_qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// The identity of this line.
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    fn matches(&self, product_id: &ProductId, variant: &Variant) -> bool {
        &self.product_id == product_id && self.size == variant.size && self.color == variant.color
    }
}

/// Identifies a cart line: product plus variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// What an [`CartStore::add`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended with quantity 1.
    Added,
    /// An existing line's quantity went up to the contained value.
    Incremented(u32),
}

type Observer = Box<dyn Fn(&[CartItem]) + Send + Sync>;

/// The shopper's cart, backed by a [`KeyValueStore`].
pub struct CartStore<S> {
    store: S,
    items: Vec<CartItem>,
    observers: Vec<Observer>,
}

impl<S> fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> CartStore<S> {
    /// Load the cart from `store`.
    ///
    /// A cart that fails to decode is discarded and the shopper starts with
    /// an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself cannot be read.
    pub fn load(store: S) -> Result<Self, CartError> {
        let items = match load_json::<Vec<CartItem>>(&store, keys::CART) {
            Ok(items) => items.unwrap_or_default(),
            Err(StorageError::Corrupt { source, .. }) => {
                warn!(error = %source, "Discarding unreadable cart");
                store.remove(keys::CART)?;
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            store,
            items,
            observers: Vec::new(),
        })
    }

    /// Register a callback run after every successful mutation.
    ///
    /// Callbacks run synchronously, after the new cart has been persisted.
    pub fn subscribe(&mut self, observer: impl Fn(&[CartItem]) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Items in the order they were first added.
    #[must_use]
    pub fn list(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns `true` if the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines (the cart badge number).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Returns `true` if this product variant is already in the cart.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId, variant: &Variant) -> bool {
        self.items
            .iter()
            .any(|item| item.matches(product_id, variant))
    }

    /// Add one unit of a product variant.
    ///
    /// An existing line for the same variant is incremented; otherwise a new
    /// line is appended.
    ///
    /// # Errors
    ///
    /// - [`CartError::VariantRequired`] if the product offers sizes or colors
    ///   and none was chosen
    /// - [`CartError::UnknownVariant`] if the choice is not offered
    /// - [`CartError::OutOfStock`] if the product has no stock
    /// - [`CartError::QuantityLimitExceeded`] if the line is already at the
    ///   stock limit; the cart is unchanged
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add(&mut self, product: &CartProduct, variant: Variant) -> Result<AddOutcome, CartError> {
        check_variant(VariantAttribute::Size, &product.sizes, variant.size.as_deref())?;
        check_variant(VariantAttribute::Color, &product.colors, variant.color.as_deref())?;

        if product.max_qty == 0 {
            return Err(CartError::OutOfStock(product.name.clone()));
        }

        let mut items = self.items.clone();
        let outcome = if let Some(item) = items
            .iter_mut()
            .find(|item| item.matches(&product.id, &variant))
        {
            if item.quantity >= product.max_qty {
                return Err(CartError::QuantityLimitExceeded {
                    name: product.name.clone(),
                    max: product.max_qty,
                });
            }
            item.quantity += 1;
            item.max_qty = product.max_qty;
            item.unit_price = product.unit_price;
            AddOutcome::Incremented(item.quantity)
        } else {
            items.push(CartItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.unit_price,
                quantity: 1,
                max_qty: product.max_qty,
                size: variant.size,
                color: variant.color,
                image: product.image.clone(),
            });
            AddOutcome::Added
        };

        self.commit(items)?;
        debug!(?outcome, "Cart updated");
        Ok(outcome)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] for an unknown line and
    /// [`CartError::QuantityLimitExceeded`] above the line's stock limit.
    pub fn set_quantity(&mut self, key: &CartKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key);
        }

        let mut items = self.items.clone();
        let item = items
            .iter_mut()
            .find(|item| &item.key() == key)
            .ok_or(CartError::NotInCart)?;
        if quantity > item.max_qty {
            return Err(CartError::QuantityLimitExceeded {
                name: item.name.clone(),
                max: item.max_qty,
            });
        }
        item.quantity = quantity;

        self.commit(items)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the line is not present.
    pub fn remove(&mut self, key: &CartKey) -> Result<(), CartError> {
        let mut items = self.items.clone();
        let before = items.len();
        items.retain(|item| &item.key() != key);
        if items.len() == before {
            return Err(CartError::NotInCart);
        }
        self.commit(items)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored cart cannot be removed.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.store.remove(keys::CART)?;
        self.items.clear();
        self.notify();
        Ok(())
    }

    fn commit(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        save_json(&self.store, keys::CART, &items)?;
        self.items = items;
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.items);
        }
    }
}

fn check_variant(
    attribute: VariantAttribute,
    offered: &[String],
    chosen: Option<&str>,
) -> Result<(), CartError> {
    match chosen {
        None if offered.is_empty() => Ok(()),
        None => Err(CartError::VariantRequired(attribute)),
        Some(value) if offered.iter().any(|o| o == value) => Ok(()),
        Some(value) => Err(CartError::UnknownVariant {
            attribute,
            value: value.to_owned(),
        }),
    }
}
