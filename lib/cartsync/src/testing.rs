//! In-memory remote with failure injection for sync and reconcile tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use shared::{cart::CartEntry, wishlist::WishlistEntry};

use crate::error::{Result, SyncError};
use crate::traits::RemoteApi;

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub wishlist: Mutex<Vec<WishlistEntry>>,
    pub cart: Mutex<Vec<CartEntry>>,
    pub calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    signed_out: AtomicBool,
    fail_item_writes: AtomicBool,
    fail_bulk_deletes: AtomicBool,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cart(entries: Vec<CartEntry>) -> Self {
        let remote = Self::new();
        *remote.cart.lock().unwrap() = entries;
        remote
    }

    pub fn with_wishlist(ids: &[&str]) -> Self {
        let remote = Self::new();
        *remote.wishlist.lock().unwrap() = ids.iter().map(|id| catalog_entry(id)).collect();
        remote
    }

    /// Every call fails with a 503.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every call fails as if no token were stored.
    pub fn set_signed_out(&self, signed_out: bool) {
        self.signed_out.store(signed_out, Ordering::SeqCst);
    }

    /// Per-item cart add/update/remove calls fail with a 503.
    pub fn set_fail_item_writes(&self, fail: bool) {
        self.fail_item_writes.store(fail, Ordering::SeqCst);
    }

    /// `delete_cart` and `reset_cart` report success without changing anything.
    pub fn set_fail_bulk_deletes(&self, fail: bool) {
        self.fail_bulk_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn cart_snapshot(&self) -> Vec<CartEntry> {
        self.cart.lock().unwrap().clone()
    }

    pub fn wishlist_ids(&self) -> Vec<String> {
        self.wishlist
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.post_id.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    fn enter(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.signed_out.load(Ordering::SeqCst) {
            return Err(SyncError::MissingToken);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn enter_item_write(&self, call: &str) -> Result<()> {
        self.enter(call)?;
        if self.fail_item_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

pub(crate) fn catalog_entry(id: &str) -> WishlistEntry {
    WishlistEntry {
        post_id: id.to_string(),
        name: format!("Product {id}"),
        price: 10.0,
        image: vec![format!("{id}.jpg")],
        category: "catalog".to_string(),
    }
}

fn unavailable() -> SyncError {
    SyncError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_wishlist(&self) -> Result<Vec<WishlistEntry>> {
        self.enter("fetch_wishlist")?;
        Ok(self.wishlist.lock().unwrap().clone())
    }

    async fn add_to_wishlist(&self, post_id: &str) -> Result<()> {
        self.enter("add_to_wishlist")?;
        let mut wishlist = self.wishlist.lock().unwrap();
        if !wishlist.iter().any(|e| e.post_id == post_id) {
            wishlist.push(catalog_entry(post_id));
        }
        Ok(())
    }

    async fn remove_from_wishlist(&self, post_id: &str) -> Result<()> {
        self.enter("remove_from_wishlist")?;
        self.wishlist.lock().unwrap().retain(|e| e.post_id != post_id);
        Ok(())
    }

    async fn fetch_cart(&self) -> Result<Vec<CartEntry>> {
        self.enter("fetch_cart")?;
        Ok(self.cart_snapshot())
    }

    async fn add_to_cart(&self, post_id: &str, quantity: u32) -> Result<()> {
        self.enter_item_write("add_to_cart")?;
        let mut cart = self.cart.lock().unwrap();
        match cart.iter_mut().find(|e| e.post_id == post_id) {
            Some(entry) => entry.quantity += quantity,
            None => cart.push(CartEntry::new(post_id, quantity)),
        }
        Ok(())
    }

    async fn update_cart_quantity(&self, post_id: &str, quantity: u32) -> Result<()> {
        self.enter_item_write("update_cart_quantity")?;
        let mut cart = self.cart.lock().unwrap();
        match cart.iter_mut().find(|e| e.post_id == post_id) {
            Some(entry) => entry.quantity = quantity,
            None => cart.push(CartEntry::new(post_id, quantity)),
        }
        Ok(())
    }

    async fn remove_from_cart(&self, post_id: &str) -> Result<()> {
        self.enter_item_write("remove_from_cart")?;
        self.cart.lock().unwrap().retain(|e| e.post_id != post_id);
        Ok(())
    }

    async fn delete_cart(&self) -> Result<()> {
        self.enter("delete_cart")?;
        if !self.fail_bulk_deletes.load(Ordering::SeqCst) {
            self.cart.lock().unwrap().clear();
        }
        Ok(())
    }

    async fn reset_cart(&self) -> Result<()> {
        self.enter("reset_cart")?;
        if !self.fail_bulk_deletes.load(Ordering::SeqCst) {
            self.cart.lock().unwrap().clear();
        }
        Ok(())
    }

    async fn replace_cart(&self, items: &[CartEntry]) -> Result<()> {
        self.enter("replace_cart")?;
        *self.cart.lock().unwrap() = items.to_vec();
        Ok(())
    }
}
