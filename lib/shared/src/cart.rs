use serde::{Deserialize, Serialize};

fn default_quantity() -> u32 {
    1
}

/// One line of the cart. `quantity` is at least 1 for any stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub post_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl CartEntry {
    pub fn new(post_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            post_id: post_id.into(),
            quantity,
        }
    }
}
