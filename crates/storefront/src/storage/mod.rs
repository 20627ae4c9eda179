//! Durable key-value state for the shopper's session.
//!
//! # Ownership
//!
//! Each key has exactly one owning component, which mediates every read and
//! write:
//!
//! - [`keys::CART`] - [`crate::cart::CartStore`]
//! - [`keys::PENDING_CHECKOUT`] and [`keys::CHECKOUT_SESSION`] -
//!   [`crate::checkout::CheckoutSession`]
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, used in tests
//! - [`FileStore`] - one JSON file per key in a data directory, used by the CLI

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys, namespaced per owner.
pub mod keys {
    /// The shopper's cart items.
    pub const CART: &str = "cart";

    /// The in-progress checkout draft (shipping details and totals).
    pub const PENDING_CHECKOUT: &str = "pending_checkout";

    /// The checkout step, payment mode and entered transaction reference.
    pub const CHECKOUT_SESSION: &str = "checkout_session";
}

/// Errors that can occur reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed to read or write.
    #[error("storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be decoded, either as text or as JSON.
    #[error("stored value for key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A value could not be encoded.
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key contains characters the backend cannot store.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A string-valued key-value store.
///
/// Modelled on browser local storage: values are opaque strings and
/// methods take `&self`, so implementations use interior mutability.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` for `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] if the stored value does not decode as `T`.
pub fn load_json<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source: Box::new(source),
        })
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns an error if encoding or the write fails.
pub fn save_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_absent() {
        let store = MemoryStore::new();
        let value: Option<Vec<u32>> = load_json(&store, "missing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_save_then_load_json() {
        let store = MemoryStore::new();
        save_json(&store, "numbers", &vec![1_u32, 2, 3]).unwrap();
        let value: Option<Vec<u32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_load_json_corrupt() {
        let store = MemoryStore::new();
        store.set("numbers", "{not json").unwrap();
        let result: Result<Option<Vec<u32>>, _> = load_json(&store, "numbers");
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_store_through_arc() {
        let store = std::sync::Arc::new(MemoryStore::new());
        save_json(&store, "flag", &true).unwrap();
        assert_eq!(store.get("flag").unwrap().as_deref(), Some("true"));
    }
}
