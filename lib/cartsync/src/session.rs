use std::sync::Arc;

use tracing::{info, warn};

use crate::error::StorageError;
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Bearer token persisted in the local store.
///
/// A stored, non-blank token is the only authentication signal. Nothing
/// tracks expiry; the HTTP client re-reads the token once after a 401.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Option<String> {
        match self.store.get_item(TOKEN_KEY) {
            Ok(Some(token)) => {
                let token = token.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read auth token: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        let token = token.trim();
        if token.is_empty() {
            return self.clear();
        }
        self.store.set_item(TOKEN_KEY, token)?;
        info!("Auth token stored");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(TOKEN_KEY)?;
        info!("Auth token cleared");
        Ok(())
    }
}
