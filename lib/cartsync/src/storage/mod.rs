//! Local cache over a string key-value store.
//!
//! The store is the offline-tolerant copy of cart and wishlist state. Reads
//! and writes through [`LocalCache`] never fail: a missing or corrupted value
//! reads as the caller's default and a failed write is logged and dropped.

#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;
#[cfg(target_arch = "wasm32")]
mod web;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::error::StorageError;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(target_arch = "wasm32")]
pub use web::WebStorage;

pub const WISHLIST_KEY: &str = "wishlist";
pub const CART_KEY: &str = "cart";
pub const CART_QUANTITIES_KEY: &str = "cartQuantities";
pub const TOKEN_KEY: &str = "token";

/// String-keyed, string-valued persistent store.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed JSON view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.store.get_item(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Discarding unreadable cache entry '{}': {}", key, e);
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read cache entry '{}': {}", key, e);
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode cache entry '{}': {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set_item(key, &json) {
            error!("Failed to write cache entry '{}': {}", key, e);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove_item(key) {
            error!("Failed to remove cache entry '{}': {}", key, e);
        }
    }
}
