use serde::{Deserialize, Serialize};

/// A product saved to the wishlist, as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub category: String,
}

impl WishlistEntry {
    /// Entry rebuilt from a locally cached ID when the remote is unavailable.
    /// Only the ID survives; price is zero and metadata is empty.
    pub fn placeholder(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            name: String::new(),
            price: 0.0,
            image: Vec::new(),
            category: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.image.is_empty() && self.category.is_empty() && self.price == 0.0
    }
}
