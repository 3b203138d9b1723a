use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    api::{ApiAck, ApiResponse},
    cart::CartEntry,
    wishlist::WishlistEntry,
};
use tracing::{debug, info};
use url::Url;

use super::models::{CartAddRequest, CartReplaceRequest, QuantityUpdateRequest, WishlistAddRequest};
use crate::{
    error::{Result, SyncError},
    session::Session,
    traits::RemoteApi,
};

/// Client-level timeout for every request (15 seconds)
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Storefront REST API client authenticated with the session's bearer token.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: Url,
    session: Session,
    client: Client,
}

#[derive(Default)]
pub struct HttpRemoteBuilder {
    base_url: Option<String>,
    session: Option<Session>,
    timeout: Option<Duration>,
}

impl HttpRemoteBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.trim().to_string());
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpRemote> {
        let base_url_str = self
            .base_url
            .ok_or(SyncError::NotConfigured("API base URL"))?;
        let session = self.session.ok_or(SyncError::NotConfigured("session"))?;
        let base_url = Url::parse(&base_url_str)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::NotConfigured("API base URL must be hierarchical"));
        }
        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        Ok(HttpRemote {
            base_url,
            session,
            client: build_client(timeout)?,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

#[cfg(target_arch = "wasm32")]
fn build_client(_timeout: Duration) -> Result<Client> {
    Ok(Client::new())
}

impl HttpRemote {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::NotConfigured("API base URL cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request with the stored token. A 401 is retried once, and
    /// only when the stored token changed while the request was in flight.
    async fn send<B: Serialize + Sync>(&self, method: Method, url: Url, body: Option<&B>) -> Result<String> {
        let token = self.session.token().ok_or(SyncError::MissingToken)?;
        match self.send_once(method.clone(), url.clone(), body, &token).await {
            Err(SyncError::Unauthorized) => match self.session.token() {
                Some(fresh) if fresh != token => {
                    info!("Auth token changed, retrying {} {}", method, url);
                    self.send_once(method, url, body, &fresh).await
                }
                _ => Err(SyncError::Unauthorized),
            },
            other => other,
        }
    }

    async fn send_once<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        token: &str,
    ) -> Result<String> {
        debug!("Request: {} {}", method, url);
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(b) = body {
            request = request.json(b);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<String> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::Unauthorized);
        }
        if status.is_success() {
            Ok(response.text().await?)
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(SyncError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn fetch_items<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let text = self.send(Method::GET, url, None::<&()>).await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| SyncError::MalformedResponse(format!("JSON parse error: {e}")))?;
        if !envelope.success {
            return Err(SyncError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "success was false".to_string()),
            ));
        }
        envelope
            .into_items()
            .ok_or_else(|| SyncError::MalformedResponse("missing data.items".to_string()))
    }

    /// Mutation calls only need `success: true`; an empty body counts as success.
    async fn mutate<B: Serialize + Sync>(&self, method: Method, url: Url, body: Option<&B>) -> Result<()> {
        let text = self.send(method, url, body).await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let ack: ApiAck = serde_json::from_str(&text)
            .map_err(|e| SyncError::MalformedResponse(format!("JSON parse error: {e}")))?;
        if ack.success {
            Ok(())
        } else {
            Err(SyncError::Rejected(
                ack.message.unwrap_or_else(|| "success was false".to_string()),
            ))
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RemoteApi for HttpRemote {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_wishlist(&self) -> Result<Vec<WishlistEntry>> {
        self.fetch_items(self.endpoint(&["wishlist"])?).await
    }

    async fn add_to_wishlist(&self, post_id: &str) -> Result<()> {
        let body = WishlistAddRequest { post_id };
        self.mutate(Method::POST, self.endpoint(&["wishlist"])?, Some(&body))
            .await
    }

    async fn remove_from_wishlist(&self, post_id: &str) -> Result<()> {
        self.mutate(Method::DELETE, self.endpoint(&["wishlist", post_id])?, None::<&()>)
            .await
    }

    async fn fetch_cart(&self) -> Result<Vec<CartEntry>> {
        self.fetch_items(self.endpoint(&["cart"])?).await
    }

    async fn add_to_cart(&self, post_id: &str, quantity: u32) -> Result<()> {
        let body = CartAddRequest { post_id, quantity };
        self.mutate(Method::POST, self.endpoint(&["cart"])?, Some(&body))
            .await
    }

    async fn update_cart_quantity(&self, post_id: &str, quantity: u32) -> Result<()> {
        let body = QuantityUpdateRequest { quantity };
        self.mutate(Method::PUT, self.endpoint(&["cart", post_id])?, Some(&body))
            .await
    }

    async fn remove_from_cart(&self, post_id: &str) -> Result<()> {
        self.mutate(Method::DELETE, self.endpoint(&["cart", post_id])?, None::<&()>)
            .await
    }

    async fn delete_cart(&self) -> Result<()> {
        info!("Deleting remote cart");
        self.mutate(Method::DELETE, self.endpoint(&["cart"])?, None::<&()>)
            .await
    }

    async fn reset_cart(&self) -> Result<()> {
        info!("Resetting remote cart");
        self.mutate(Method::POST, self.endpoint(&["cart", "reset"])?, None::<&()>)
            .await
    }

    async fn replace_cart(&self, items: &[CartEntry]) -> Result<()> {
        info!("Replacing remote cart with {} items", items.len());
        let body = CartReplaceRequest { items };
        self.mutate(Method::PUT, self.endpoint(&["cart"])?, Some(&body))
            .await
    }
}
