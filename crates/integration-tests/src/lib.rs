//! Integration tests for Spice Market.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p spice-market-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `scenarios` - end-to-end flows through [`StorefrontClient`] against the
//!   in-process gateway
//! - `concurrency` - coalescing, racing mutations and concurrent seeding
//! - `http_gateway` - the HTTP gateway against a local stub server
//!
//! Helpers shared by the test files live here.

use std::time::Duration;

use spice_market_core::{NewProduct, Price, Product, ProductId};
use spice_market_storefront::StorefrontClient;
use spice_market_storefront::gateway::InMemoryGateway;

/// Simulated gateway round trip used by the concurrency tests.
pub const GATEWAY_LATENCY: Duration = Duration::from_millis(50);

/// A client over a fresh, empty in-process gateway.
#[must_use]
pub fn empty_store() -> StorefrontClient<InMemoryGateway> {
    StorefrontClient::new(InMemoryGateway::new())
}

/// A client whose gateway takes [`GATEWAY_LATENCY`] per call.
///
/// Pair with `#[tokio::test(start_paused = true)]`.
#[must_use]
pub fn slow_store() -> StorefrontClient<InMemoryGateway> {
    StorefrontClient::new(InMemoryGateway::new().with_latency(GATEWAY_LATENCY))
}

/// A product input with a placeholder description and image.
#[must_use]
pub fn new_product(name: &str, cents: u64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: format!("{name} for testing"),
        price: Price::from_cents(cents),
        image_url: format!("{}.png", name.to_lowercase().replace(' ', "-")),
        available: true,
    }
}

/// The stored form of [`new_product`].
#[must_use]
pub fn product(id: u64, name: &str, cents: u64) -> Product {
    new_product(name, cents).into_product(ProductId::new(id))
}
