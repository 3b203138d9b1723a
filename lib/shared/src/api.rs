//! Response envelopes of the remote storefront API.
//!
//! Only the `success` flag and, for listings, the `data.items` array are
//! relied upon. Everything else in a response is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsData<T> {
    pub items: Vec<T>,
}

/// Envelope of a listing response: `{ "success": true, "data": { "items": [...] } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<ItemsData<T>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Items of a successful response, `None` when the call was refused or
    /// the payload carries no item list.
    pub fn into_items(self) -> Option<Vec<T>> {
        if !self.success {
            return None;
        }
        self.data.map(|d| d.items)
    }
}

/// Acknowledgement of a mutation; only `success` is inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
