use async_trait::async_trait;
use shared::{cart::CartEntry, wishlist::WishlistEntry};

use crate::error::Result;

/// Remote replica of the cart and wishlist.
///
/// Implementations report every failure, including malformed payloads, as
/// an error; deciding what to do about it is left to the sync layer.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RemoteApi: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_wishlist(&self) -> Result<Vec<WishlistEntry>>;
    async fn add_to_wishlist(&self, post_id: &str) -> Result<()>;
    async fn remove_from_wishlist(&self, post_id: &str) -> Result<()>;

    async fn fetch_cart(&self) -> Result<Vec<CartEntry>>;
    async fn add_to_cart(&self, post_id: &str, quantity: u32) -> Result<()>;
    async fn update_cart_quantity(&self, post_id: &str, quantity: u32) -> Result<()>;
    async fn remove_from_cart(&self, post_id: &str) -> Result<()>;

    /// Drops the whole remote cart.
    async fn delete_cart(&self) -> Result<()>;
    /// Asks the remote to reset the cart to its initial, empty state.
    async fn reset_cart(&self) -> Result<()>;
    /// Overwrites the remote cart with `items` in one call.
    async fn replace_cart(&self, items: &[CartEntry]) -> Result<()>;
}
