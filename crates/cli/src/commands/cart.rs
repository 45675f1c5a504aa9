//! Cart commands.

use spice_market_core::ProductId;
use spice_market_storefront::cart::CartSummary;
use spice_market_storefront::gateway::Gateway;
use spice_market_storefront::{AppError, StorefrontClient};
use tracing::info;

/// Show line items and totals.
pub async fn show<G: Gateway>(client: &StorefrontClient<G>) -> Result<(), AppError> {
    let items = client.cart_with_products().await.into_loaded()?;
    if items.is_empty() {
        info!("Cart is empty");
        return Ok(());
    }

    for item in &items {
        match (&item.product, item.line_total()) {
            (Some(product), Some(total)) => info!(
                "{:>3} x {:<20} {:>8}",
                item.quantity,
                product.name,
                total.to_string()
            ),
            _ => info!(
                "{:>3} x product #{} (unavailable)",
                item.quantity, item.product_id
            ),
        }
    }

    let summary = CartSummary::from_line_items(&items);
    info!(
        items = summary.item_count,
        unavailable = summary.unavailable,
        "Subtotal {}",
        summary.subtotal
    );
    Ok(())
}

/// Set a product's quantity and show the refreshed cart.
pub async fn set_quantity<G: Gateway>(
    client: &StorefrontClient<G>,
    id: ProductId,
    quantity: u64,
) -> Result<(), AppError> {
    client.set_quantity(id, quantity).await?;
    if quantity == 0 {
        info!(product_id = %id, "Removed from cart");
    } else {
        info!(product_id = %id, quantity, "Cart updated");
    }
    show(client).await
}

/// Change a product's quantity by `delta` and show the refreshed cart.
pub async fn adjust<G: Gateway>(
    client: &StorefrontClient<G>,
    id: ProductId,
    delta: i64,
) -> Result<(), AppError> {
    let quantity = client.adjust_quantity(id, delta).await?;
    info!(product_id = %id, delta, quantity, "Cart adjusted");
    show(client).await
}
