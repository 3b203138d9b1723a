use std::sync::Arc;

use tracing::info;

use crate::cart::CartSync;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::http::HttpRemoteBuilder;
use crate::reconcile::Reconciler;
use crate::session::Session;
use crate::storage::{KeyValueStore, LocalCache};
use crate::traits::RemoteApi;
use crate::wishlist::WishlistSync;

pub struct Services {
    session: Session,
    wishlist: WishlistSync,
    cart: CartSync,
    remote: Arc<dyn RemoteApi>,
}

impl Services {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn wishlist(&self) -> &WishlistSync {
        &self.wishlist
    }

    pub fn cart(&self) -> &CartSync {
        &self.cart
    }

    pub fn remote_name(&self) -> &'static str {
        self.remote.name()
    }
}

pub struct ServicesBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    remote: Option<Arc<dyn RemoteApi>>,
    config: SyncConfig,
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            remote: None,
            config: SyncConfig::default(),
        }
    }

    pub fn store(self, store: impl KeyValueStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    pub fn shared_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the HTTP client built from the configuration.
    pub fn remote(mut self, remote: impl RemoteApi + 'static) -> Self {
        self.remote = Some(Arc::new(remote));
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Services> {
        let store = self
            .store
            .ok_or(SyncError::NotConfigured("a key-value store is required"))?;
        let session = Session::new(store.clone());

        let remote: Arc<dyn RemoteApi> = match self.remote {
            Some(remote) => remote,
            None => Arc::new(
                HttpRemoteBuilder::new()
                    .base_url(&self.config.api_url)
                    .session(session.clone())
                    .timeout(self.config.request_timeout)
                    .build()?,
            ),
        };

        let cache = LocalCache::new(store);
        let reconciler = Reconciler::new(remote.clone(), self.config.retry);
        let wishlist = WishlistSync::new(remote.clone(), cache.clone(), self.config.remove_policy);
        let cart = CartSync::new(remote.clone(), cache, reconciler, self.config.remove_policy);
        info!(
            "Services ready (remote: {}, remove policy: {:?})",
            remote.name(),
            self.config.remove_policy
        );

        Ok(Services {
            session,
            wishlist,
            cart,
            remote,
        })
    }
}

impl Default for ServicesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
