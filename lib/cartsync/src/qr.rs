use std::sync::LazyLock;

use regex::Regex;
use shared::product::ProductRef;
use url::Url;

use crate::error::ScanError;

static RE_PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());
static RE_PRODUCT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)products?/([A-Za-z0-9_-]{1,64})(?:[/?#]|$)").unwrap()
});

const PRODUCT_SCHEME: &str = "product:";

/// Resolves a scanned QR payload to the product page it refers to.
///
/// Accepts product page URLs and paths (`/product/<id>`, `/products/<id>`),
/// `product:<id>` URIs and bare product IDs.
pub fn resolve_scan(payload: &str) -> Result<ProductRef, ScanError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ScanError::Empty);
    }

    if let Some(id) = strip_prefix_ignore_case(payload, PRODUCT_SCHEME) {
        let id = id.trim_start_matches('/');
        return if RE_PRODUCT_ID.is_match(id) {
            Ok(ProductRef::new(id))
        } else {
            Err(ScanError::NotAProduct(payload.to_string()))
        };
    }

    if let Ok(url) = Url::parse(payload) {
        return id_from_path(url.path())
            .map(ProductRef::new)
            .ok_or_else(|| ScanError::NotAProduct(payload.to_string()));
    }

    if payload.contains('/') {
        return id_from_path(payload)
            .map(ProductRef::new)
            .ok_or_else(|| ScanError::NotAProduct(payload.to_string()));
    }

    if RE_PRODUCT_ID.is_match(payload) {
        return Ok(ProductRef::new(payload));
    }
    Err(ScanError::NotAProduct(payload.to_string()))
}

fn id_from_path(path: &str) -> Option<&str> {
    RE_PRODUCT_PATH
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}
