use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use serde_json::Value;
use shared::cart::CartEntry;
use tracing::{info, warn};

use crate::config::RemovePolicy;
use crate::error::Result;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::storage::{LocalCache, CART_KEY, CART_QUANTITIES_KEY};
use crate::traits::RemoteApi;

/// Cart as persisted locally: an ordered ID list plus an ID to quantity map.
///
/// Every entry has a quantity of at least 1 and appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCart {
    entries: Vec<CartEntry>,
}

impl LocalCart {
    /// Reads both cart keys and repairs any disagreement between them.
    pub fn load(cache: &LocalCache) -> Self {
        let ids: Vec<String> = cache.get(CART_KEY, Vec::new());
        let mut quantities: BTreeMap<String, Value> =
            cache.get(CART_QUANTITIES_KEY, BTreeMap::new());

        let listed = ids.len();
        let mut repaired = false;
        let entries: Vec<CartEntry> = ids
            .into_iter()
            .unique()
            .filter_map(|id| {
                let quantity = match quantities.remove(&id) {
                    Some(raw) => match stored_quantity(&raw) {
                        Some(q) => q,
                        None => {
                            repaired = true;
                            return None;
                        }
                    },
                    None => {
                        repaired = true;
                        1
                    }
                };
                Some(CartEntry::new(id, quantity))
            })
            .collect();

        if repaired || !quantities.is_empty() || entries.len() != listed {
            warn!(
                "Repaired local cart: {} listed ids, {} kept, {} orphan quantities dropped",
                listed,
                entries.len(),
                quantities.len()
            );
        }
        Self { entries }
    }

    /// Builds a cart from arbitrary entries. The first occurrence of an ID
    /// wins and zero quantities are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = CartEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| e.quantity > 0)
            .unique_by(|e| e.post_id.clone())
            .collect();
        Self { entries }
    }

    pub fn save(&self, cache: &LocalCache) {
        let ids: Vec<&str> = self.entries.iter().map(|e| e.post_id.as_str()).collect();
        let quantities: BTreeMap<&str, u32> = self
            .entries
            .iter()
            .map(|e| (e.post_id.as_str(), e.quantity))
            .collect();
        cache.set(CART_KEY, &ids);
        cache.set(CART_QUANTITIES_KEY, &quantities);
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CartEntry> {
        self.entries
    }

    pub fn quantity(&self, post_id: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.post_id == post_id)
            .map(|e| e.quantity)
    }

    /// Sets the quantity of an item, appending it if new. Zero removes it.
    pub fn set(&mut self, post_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(post_id);
            return;
        }
        match self.entries.iter_mut().find(|e| e.post_id == post_id) {
            Some(entry) => entry.quantity = quantity,
            None => self.entries.push(CartEntry::new(post_id, quantity)),
        }
    }

    pub fn remove(&mut self, post_id: &str) {
        self.entries.retain(|e| e.post_id != post_id);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A stored quantity is kept only if it is a whole number in `1..=u32::MAX`.
fn stored_quantity(raw: &Value) -> Option<u32> {
    raw.as_u64()
        .filter(|&q| q > 0)
        .and_then(|q| u32::try_from(q).ok())
}

/// Cart kept in the local cache and mirrored to the remote API. Bulk
/// operations go through the [`Reconciler`].
#[derive(Clone)]
pub struct CartSync {
    remote: Arc<dyn RemoteApi>,
    cache: LocalCache,
    reconciler: Reconciler,
    remove_policy: RemovePolicy,
}

impl CartSync {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        cache: LocalCache,
        reconciler: Reconciler,
        remove_policy: RemovePolicy,
    ) -> Self {
        Self {
            remote,
            cache,
            reconciler,
            remove_policy,
        }
    }

    pub fn local_entries(&self) -> Vec<CartEntry> {
        LocalCart::load(&self.cache).into_entries()
    }

    /// Remote cart, written back to the local cache. Falls back to the
    /// cached entries when the remote cannot be read.
    pub async fn fetch_all(&self) -> Result<Vec<CartEntry>> {
        match self.remote.fetch_cart().await {
            Ok(entries) => {
                let cart = LocalCart::from_entries(entries);
                cart.save(&self.cache);
                Ok(cart.into_entries())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Cart fetch via {} failed, using local cache: {}", self.remote.name(), e);
                Ok(self.local_entries())
            }
        }
    }

    /// Adds `quantity` (at least 1) of a product, incrementing any existing
    /// line. The local cart is updated in every case; the result is whether
    /// the remote accepted the change.
    pub async fn add(&self, post_id: &str, quantity: u32) -> Result<bool> {
        let quantity = quantity.max(1);
        let existing = LocalCart::load(&self.cache).quantity(post_id);

        let call = match existing {
            Some(current) => self
                .remote
                .update_cart_quantity(post_id, current.saturating_add(quantity))
                .await,
            None => self.remote.add_to_cart(post_id, quantity).await,
        };
        let remote_ok = match call {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote cart add of {} failed, saving locally: {}", post_id, e);
                false
            }
        };

        let mut cart = LocalCart::load(&self.cache);
        let total = cart.quantity(post_id).unwrap_or(0).saturating_add(quantity);
        cart.set(post_id, total);
        cart.save(&self.cache);
        info!("Cart now holds {} x {}", total, post_id);
        Ok(remote_ok)
    }

    /// Sets the quantity of a line. Zero removes the line.
    pub async fn set_quantity(&self, post_id: &str, quantity: u32) -> Result<bool> {
        if quantity == 0 {
            return self.remove(post_id).await;
        }
        let remote_ok = match self.remote.update_cart_quantity(post_id, quantity).await {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote quantity update of {} failed, saving locally: {}", post_id, e);
                false
            }
        };

        let mut cart = LocalCart::load(&self.cache);
        cart.set(post_id, quantity);
        cart.save(&self.cache);
        Ok(remote_ok)
    }

    /// Removes the line locally in every case. The result follows the
    /// configured [`RemovePolicy`].
    pub async fn remove(&self, post_id: &str) -> Result<bool> {
        let remote_ok = match self.remote.remove_from_cart(post_id).await {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote cart removal of {} failed, removing locally: {}", post_id, e);
                false
            }
        };

        let mut cart = LocalCart::load(&self.cache);
        cart.remove(post_id);
        cart.save(&self.cache);
        info!("Removed {} from cart", post_id);
        Ok(self.remove_policy.outcome(remote_ok))
    }

    /// Empties the remote cart, then the local one whatever the remote did.
    pub async fn clear(&self) -> Result<ReconcileReport> {
        let report = self.reconciler.reconcile(&[]).await?;
        LocalCart::default().save(&self.cache);
        info!(
            "Cleared cart (remote verified: {}, escalations: {})",
            report.verified,
            report.escalations.len()
        );
        Ok(report)
    }

    /// Pushes the local cart to the remote.
    pub async fn sync(&self) -> Result<ReconcileReport> {
        let local = self.local_entries();
        self.reconciler.reconcile(&local).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::retry::RetryPolicy;
    use crate::storage::MemoryStore;
    use crate::testing::FakeRemote;

    fn cache_with(items: &[(&str, &str)]) -> LocalCache {
        LocalCache::new(Arc::new(MemoryStore::with_items(
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )))
    }

    fn cart_with(remote: &Arc<FakeRemote>, cache: LocalCache) -> CartSync {
        let reconciler = Reconciler::new(remote.clone(), RetryPolicy::immediate(2));
        CartSync::new(remote.clone(), cache, reconciler, RemovePolicy::LocalFirst)
    }

    fn entry(id: &str, quantity: u32) -> CartEntry {
        CartEntry::new(id, quantity)
    }

    #[test]
    fn load_repairs_disagreeing_keys() {
        let cache = cache_with(&[
            (CART_KEY, r#"["a","b","a","c"]"#),
            (CART_QUANTITIES_KEY, r#"{"a":2,"c":0,"orphan":5}"#),
        ]);

        let cart = LocalCart::load(&cache);

        assert_eq!(cart.entries(), &[entry("a", 2), entry("b", 1)]);
    }

    #[test]
    fn load_drops_items_with_invalid_quantities() {
        let cache = cache_with(&[
            (CART_KEY, r#"["a","b","c","d","e"]"#),
            (
                CART_QUANTITIES_KEY,
                r#"{"a":3,"b":-1,"c":2.5,"d":"4","e":1}"#,
            ),
        ]);

        let cart = LocalCart::load(&cache);

        assert_eq!(cart.entries(), &[entry("a", 3), entry("e", 1)]);
    }

    #[test]
    fn load_of_corrupted_keys_is_empty() {
        let cache = cache_with(&[(CART_KEY, "{not json"), (CART_QUANTITIES_KEY, "[]")]);
        assert!(LocalCart::load(&cache).is_empty());
    }

    #[test]
    fn save_writes_both_keys() {
        let cache = cache_with(&[]);
        let mut cart = LocalCart::default();
        cart.set("b", 2);
        cart.set("a", 1);
        cart.set("b", 0);
        cart.save(&cache);

        let ids: Vec<String> = cache.get(CART_KEY, Vec::new());
        let quantities: BTreeMap<String, u32> = cache.get(CART_QUANTITIES_KEY, BTreeMap::new());
        assert_eq!(ids, vec!["a".to_string()]);
        assert_eq!(quantities, BTreeMap::from([("a".to_string(), 1)]));
        assert_eq!(LocalCart::load(&cache), cart);
    }

    #[test]
    fn from_entries_keeps_first_occurrence() {
        let cart = LocalCart::from_entries([entry("a", 1), entry("b", 0), entry("a", 5)]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity("a"), Some(1));
        assert_eq!(cart.quantity("b"), None);
    }

    #[tokio::test]
    async fn add_increments_existing_line() {
        let remote = Arc::new(FakeRemote::new());
        let cart = cart_with(&remote, cache_with(&[]));

        assert!(cart.add("a", 1).await.unwrap());
        assert!(cart.add("a", 2).await.unwrap());
        assert!(cart.add("b", 0).await.unwrap());

        assert_eq!(cart.local_entries(), vec![entry("a", 3), entry("b", 1)]);
        assert_eq!(remote.cart_snapshot(), vec![entry("a", 3), entry("b", 1)]);
        assert_eq!(remote.count_calls("update_cart_quantity"), 1);
    }

    #[tokio::test]
    async fn offline_add_and_remove_update_local_cart() {
        let remote = Arc::new(FakeRemote::new());
        remote.set_offline(true);
        let cart = cart_with(&remote, cache_with(&[]));

        assert!(!cart.add("a", 2).await.unwrap());
        assert_eq!(cart.local_entries(), vec![entry("a", 2)]);

        assert!(cart.remove("a").await.unwrap());
        assert!(cart.local_entries().is_empty());
    }

    #[tokio::test]
    async fn remove_drops_quantity_entry() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("a", 1), entry("b", 4)]));
        let cache = cache_with(&[
            (CART_KEY, r#"["a","b"]"#),
            (CART_QUANTITIES_KEY, r#"{"a":1,"b":4}"#),
        ]);
        let cart = cart_with(&remote, cache.clone());

        cart.remove("b").await.unwrap();

        let quantities: BTreeMap<String, u32> = cache.get(CART_QUANTITIES_KEY, BTreeMap::new());
        assert!(!quantities.contains_key("b"));
        assert_eq!(remote.cart_snapshot(), vec![entry("a", 1)]);
    }

    #[tokio::test]
    async fn concurrent_removes_converge_on_absent() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("a", 1), entry("b", 4)]));
        let cache = cache_with(&[
            (CART_KEY, r#"["a","b"]"#),
            (CART_QUANTITIES_KEY, r#"{"a":1,"b":4}"#),
        ]);
        let cart = cart_with(&remote, cache.clone());

        let (first, second) = tokio::join!(cart.remove("b"), cart.remove("b"));

        assert!(first.unwrap());
        assert!(second.unwrap());
        assert_eq!(cart.local_entries(), vec![entry("a", 1)]);
        let ids: Vec<String> = cache.get(CART_KEY, Vec::new());
        let quantities: BTreeMap<String, u32> = cache.get(CART_QUANTITIES_KEY, BTreeMap::new());
        assert_eq!(ids, vec!["a".to_string()]);
        assert_eq!(quantities, BTreeMap::from([("a".to_string(), 1)]));
        assert_eq!(remote.cart_snapshot(), vec![entry("a", 1)]);
    }

    #[tokio::test]
    async fn set_quantity_zero_removes_line() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("a", 2)]));
        let cache = cache_with(&[(CART_KEY, r#"["a"]"#), (CART_QUANTITIES_KEY, r#"{"a":2}"#)]);
        let cart = cart_with(&remote, cache);

        assert!(cart.set_quantity("a", 5).await.unwrap());
        assert_eq!(cart.local_entries(), vec![entry("a", 5)]);

        assert!(cart.set_quantity("a", 0).await.unwrap());
        assert!(cart.local_entries().is_empty());
        assert_eq!(remote.count_calls("remove_from_cart"), 1);
    }

    #[tokio::test]
    async fn fetch_writes_back_and_falls_back_offline() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("r", 2)]));
        let cart = cart_with(&remote, cache_with(&[]));

        assert_eq!(cart.fetch_all().await.unwrap(), vec![entry("r", 2)]);
        assert_eq!(cart.local_entries(), vec![entry("r", 2)]);

        remote.set_offline(true);
        assert_eq!(cart.fetch_all().await.unwrap(), vec![entry("r", 2)]);
    }

    #[tokio::test]
    async fn clear_while_offline_still_empties_local_cart() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("a", 1)]));
        remote.set_offline(true);
        let cache = cache_with(&[(CART_KEY, r#"["a"]"#), (CART_QUANTITIES_KEY, r#"{"a":1}"#)]);
        let cart = cart_with(&remote, cache);

        let report = cart.clear().await.unwrap();

        assert!(!report.remote_reachable);
        assert!(cart.local_entries().is_empty());
        assert_eq!(remote.cart_snapshot(), vec![entry("a", 1)]);
    }

    #[tokio::test]
    async fn clear_without_token_keeps_local_cart() {
        let remote = Arc::new(FakeRemote::new());
        remote.set_signed_out(true);
        let cache = cache_with(&[(CART_KEY, r#"["a"]"#), (CART_QUANTITIES_KEY, r#"{"a":1}"#)]);
        let cart = cart_with(&remote, cache);

        assert!(matches!(cart.clear().await, Err(SyncError::MissingToken)));
        assert_eq!(cart.local_entries(), vec![entry("a", 1)]);
    }

    #[tokio::test]
    async fn sync_pushes_local_cart() {
        let remote = Arc::new(FakeRemote::with_cart(vec![entry("stale", 1)]));
        let cache = cache_with(&[(CART_KEY, r#"["a"]"#), (CART_QUANTITIES_KEY, r#"{"a":3}"#)]);
        let cart = cart_with(&remote, cache);

        let report = cart.sync().await.unwrap();

        assert!(report.verified);
        assert_eq!(remote.cart_snapshot(), vec![entry("a", 3)]);
    }
}
