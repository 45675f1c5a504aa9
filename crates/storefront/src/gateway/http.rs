//! JSON-over-HTTP gateway client.
//!
//! | Operation           | Request                    | Response                  |
//! |---------------------|----------------------------|---------------------------|
//! | `list_products`     | `GET /products`            | `[Product]`               |
//! | `get_product`       | `GET /products/{id}`       | `Product`, 404 = absent   |
//! | `create_product`    | `POST /products`           | `{"id": n}`               |
//! | `get_cart`          | `GET /cart`                | `[CartEntry]`             |
//! | `set_cart_quantity` | `PUT /cart/{id}`           | any 2xx                   |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spice_market_core::{CartEntry, NewProduct, Product, ProductId};
use tracing::{debug, instrument};
use url::Url;

use super::{Gateway, GatewayError};
use crate::config::GatewayConfig;

/// Longest slice of a response body kept in errors and logs.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the remote data service over HTTP.
///
/// Cheap to clone; clones share the connection pool and the
/// "has ever connected" flag.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    /// Set on the first response of any status. Until then, connection
    /// failures mean "not connected yet" rather than "call failed".
    connected: AtomicBool,
}

#[derive(Serialize)]
struct SetQuantityBody {
    quantity: u64,
}

#[derive(Deserialize)]
struct CreatedBody {
    id: ProductId,
}

impl HttpGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        debug!(url = %config.url, authenticated = config.has_token(), "Created gateway client");

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base_url: with_trailing_slash(config.url.clone()),
                token: config.token.clone(),
                connected: AtomicBool::new(false),
            }),
        })
    }

    /// Resolve a path relative to the gateway base URL.
    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| GatewayError::Remote(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request, classifying transport failures and error statuses.
    ///
    /// `404` is passed through so callers can treat it as absence.
    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let request = match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if (e.is_connect() || e.is_timeout()) && !self.is_connected() => {
                debug!(error = %e, "Gateway not reachable yet");
                return Err(GatewayError::Unavailable(e.to_string()));
            }
            Err(e) => return Err(GatewayError::Http(e.to_string())),
        };

        self.inner.connected.store(true, Ordering::Release);

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %preview(&body),
            "Gateway returned non-success status"
        );
        Err(GatewayError::Status {
            status: status.as_u16(),
            body: preview(&body),
        })
    }

    /// Decode a JSON response body, logging the body on failure.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&text),
                "Failed to parse gateway response"
            );
            GatewayError::from(e)
        })
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

impl Gateway for HttpGateway {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        let url = self.endpoint("products")?;
        let response = self.send(self.inner.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found_route("products"));
        }
        Self::read_json(response).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, GatewayError> {
        let url = self.endpoint(&format!("products/{id}"))?;
        let response = self.send(self.inner.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Product not found");
            return Ok(None);
        }
        Self::read_json(response).await.map(Some)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: NewProduct) -> Result<ProductId, GatewayError> {
        let url = self.endpoint("products")?;
        let response = self
            .send(self.inner.client.post(url).json(&product))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found_route("products"));
        }
        let created: CreatedBody = Self::read_json(response).await?;
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Vec<CartEntry>, GatewayError> {
        let url = self.endpoint("cart")?;
        let response = self.send(self.inner.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found_route("cart"));
        }
        Self::read_json(response).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn set_cart_quantity(&self, id: ProductId, quantity: u64) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("cart/{id}"))?;
        let response = self
            .send(self.inner.client.put(url).json(&SetQuantityBody { quantity }))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found_route("cart"));
        }
        Ok(())
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn not_found_route(route: &str) -> GatewayError {
    GatewayError::Status {
        status: StatusCode::NOT_FOUND.as_u16(),
        body: format!("no {route} endpoint at this gateway"),
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(url: &str) -> GatewayConfig {
        GatewayConfig {
            url: Url::parse(url).unwrap(),
            token: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let gateway = HttpGateway::new(&config("http://localhost:8080/api/v1")).unwrap();
        assert_eq!(
            gateway.endpoint("products/7").unwrap().as_str(),
            "http://localhost:8080/api/v1/products/7"
        );
        assert_eq!(
            gateway.endpoint("cart").unwrap().as_str(),
            "http://localhost:8080/api/v1/cart"
        );
    }

    #[test]
    fn test_endpoint_with_root_base() {
        let gateway = HttpGateway::new(&config("http://localhost:8080")).unwrap();
        assert_eq!(
            gateway.endpoint("products").unwrap().as_str(),
            "http://localhost:8080/products"
        );
    }

    #[test]
    fn test_preview_truncates() {
        let body = "x".repeat(500);
        assert_eq!(preview(&body).len(), BODY_PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable_before_first_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gateway = HttpGateway::new(&config(&format!("http://127.0.0.1:{port}"))).unwrap();
        let err = gateway.list_products().await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err}");
    }
}
