use std::sync::Arc;

use shared::wishlist::WishlistEntry;
use tracing::{info, warn};

use crate::config::RemovePolicy;
use crate::error::Result;
use crate::storage::{LocalCache, WISHLIST_KEY};
use crate::traits::RemoteApi;

/// Wishlist kept as a list of product IDs in the local cache, mirrored to
/// the remote API whenever it answers.
#[derive(Clone)]
pub struct WishlistSync {
    remote: Arc<dyn RemoteApi>,
    cache: LocalCache,
    remove_policy: RemovePolicy,
}

impl WishlistSync {
    pub fn new(remote: Arc<dyn RemoteApi>, cache: LocalCache, remove_policy: RemovePolicy) -> Self {
        Self {
            remote,
            cache,
            remove_policy,
        }
    }

    pub fn local_ids(&self) -> Vec<String> {
        self.cache.get(WISHLIST_KEY, Vec::new())
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.local_ids().iter().any(|id| id == post_id)
    }

    /// Remote wishlist, cached locally. When the remote cannot be read the
    /// cached IDs come back as placeholder entries without product data.
    pub async fn fetch_all(&self) -> Result<Vec<WishlistEntry>> {
        match self.remote.fetch_wishlist().await {
            Ok(entries) => {
                let ids: Vec<&str> = entries.iter().map(|e| e.post_id.as_str()).collect();
                self.cache.set(WISHLIST_KEY, &ids);
                Ok(entries)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Wishlist fetch via {} failed, using local cache: {}", self.remote.name(), e);
                Ok(self
                    .local_ids()
                    .into_iter()
                    .map(WishlistEntry::placeholder)
                    .collect())
            }
        }
    }

    /// Adds the product locally in every case. Returns whether the remote
    /// accepted it.
    pub async fn add(&self, post_id: &str) -> Result<bool> {
        let remote_ok = match self.remote.add_to_wishlist(post_id).await {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote wishlist add of {} failed, saving locally: {}", post_id, e);
                false
            }
        };
        let mut ids = self.local_ids();
        if !ids.iter().any(|id| id == post_id) {
            ids.push(post_id.to_string());
            self.cache.set(WISHLIST_KEY, &ids);
        }
        info!("Added {} to wishlist", post_id);
        Ok(remote_ok)
    }

    /// Removes the product locally in every case. The result follows the
    /// configured [`RemovePolicy`].
    pub async fn remove(&self, post_id: &str) -> Result<bool> {
        let remote_ok = match self.remote.remove_from_wishlist(post_id).await {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote wishlist removal of {} failed, removing locally: {}", post_id, e);
                false
            }
        };
        let mut ids = self.local_ids();
        ids.retain(|id| id != post_id);
        self.cache.set(WISHLIST_KEY, &ids);
        info!("Removed {} from wishlist", post_id);
        Ok(self.remove_policy.outcome(remote_ok))
    }
}
