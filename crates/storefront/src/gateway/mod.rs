//! Remote data gateway: the authoritative source of products and carts.
//!
//! # Architecture
//!
//! - The gateway is the only source of truth - the client never mutates
//!   cached state locally, it invalidates and re-fetches
//! - [`Gateway`] is the seam: [`HttpGateway`] talks JSON over HTTP,
//!   [`InMemoryGateway`] keeps everything in process (demos and tests)
//!
//! # Error taxonomy
//!
//! - [`GatewayError::Unavailable`] - no connection established yet; views
//!   render as loading rather than failed
//! - everything else - a failed remote call, surfaced to the caller who may
//!   retry; cached values are kept
//!
//! "Product not found" is not an error: `get_product` returns `Ok(None)`.

mod http;
mod memory;

use std::future::Future;

use spice_market_core::{CartEntry, NewProduct, Product, ProductId};
use thiserror::Error;

pub use http::HttpGateway;
pub use memory::{CallCounts, InMemoryGateway, Operation};

/// Errors that can occur when calling the gateway.
///
/// Cloneable so a failure can be stored next to a cached view and handed to
/// every caller that coalesced onto the same fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No connection to the gateway has been established yet.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport failed after the gateway had been reached.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The gateway answered with a non-success status.
    #[error("Gateway returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// The gateway rejected or failed the call.
    #[error("Remote call failed: {0}")]
    Remote(String),
}

impl GatewayError {
    /// Whether the gateway has simply not been reached yet.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Operations the storefront consumes from the remote data service.
///
/// Every call is a suspension point; implementors must be shareable across
/// tasks because product lookups run concurrently.
pub trait Gateway: Send + Sync + 'static {
    /// List the whole catalog.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, GatewayError>> + Send;

    /// Look up one product. `Ok(None)` when the key does not resolve.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, GatewayError>> + Send;

    /// Create a product, returning its gateway-assigned key.
    fn create_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<ProductId, GatewayError>> + Send;

    /// Raw cart entries. May contain several entries for one product.
    fn get_cart(&self) -> impl Future<Output = Result<Vec<CartEntry>, GatewayError>> + Send;

    /// Set the cart quantity for a product. A quantity of 0 removes it.
    fn set_cart_quantity(
        &self,
        id: ProductId,
        quantity: u64,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
