use serde::Serialize;
use shared::cart::CartEntry;

// Request bodies sent to the storefront API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WishlistAddRequest<'a> {
    pub post_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartAddRequest<'a> {
    pub post_id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuantityUpdateRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct CartReplaceRequest<'a> {
    pub items: &'a [CartEntry],
}
