use serde::{Deserialize, Serialize};

/// A product resolved from a scanned code, with the page it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: String,
    pub path: String,
}

impl ProductRef {
    pub fn new(product_id: impl Into<String>) -> Self {
        let product_id = product_id.into();
        let path = format!("/product/{product_id}");
        Self { product_id, path }
    }
}
