//! End-to-end walkthrough against an in-process gateway.
//!
//! Seeds an empty catalog, shows that concurrent reads share one gateway
//! call, edits the cart (including a raw duplicate entry) and places an
//! order.

use std::time::Duration;

use spice_market_core::{CartEntry, Email};
use spice_market_storefront::gateway::{GatewayError, InMemoryGateway};
use spice_market_storefront::handoff::ContactDetails;
use spice_market_storefront::{AppError, StorefrontClient};
use tracing::info;

use super::{cart, catalog};

const GATEWAY_LATENCY: Duration = Duration::from_millis(25);

pub async fn run() -> Result<(), AppError> {
    let client = StorefrontClient::new(InMemoryGateway::new().with_latency(GATEWAY_LATENCY));

    info!("Step 1: seed the empty catalog");
    catalog::report_seed(&client.ensure_seeded().await);
    let products = client.all_products().await.into_loaded()?;
    info!(count = products.len(), "Catalog loaded");

    info!("Step 2: three concurrent cart reads");
    let before = client.gateway().calls().get_cart;
    let _ = tokio::join!(client.cart(), client.cart(), client.cart());
    info!(
        gateway_calls = client.gateway().calls().get_cart - before,
        "Concurrent reads coalesced"
    );

    let Some(first) = products.first() else {
        return Err(AppError::Gateway(GatewayError::Remote(
            "catalog is empty after seeding".to_string(),
        )));
    };

    info!("Step 3: set {} to 3", first.name);
    cart::set_quantity(&client, first.id, 3).await?;

    if let Some(second) = products.get(1) {
        info!("Step 4: a duplicate raw entry for {} is merged", second.name);
        client
            .gateway()
            .push_raw_cart_entry(CartEntry::new(second.id, 1));
        client
            .gateway()
            .push_raw_cart_entry(CartEntry::new(second.id, 1));
        client.refresh_all();
        cart::show(&client).await?;
    }

    info!("Step 5: check out");
    let email = Email::parse("cook@example.com")?;
    let order = client
        .checkout(ContactDetails {
            name: "Demo Cook".to_string(),
            email,
            phone: "555-0100".to_string(),
            street: "1 Spice Row".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        })
        .await?;

    if let Some(confirmation) = client.handoff().take() {
        info!(
            reference = %confirmation.short_reference(),
            total = %confirmation.total,
            placed_at = %confirmation.placed_at,
            "Order confirmed"
        );
    }
    info!(reference = %order.reference, "Demo complete");
    Ok(())
}
