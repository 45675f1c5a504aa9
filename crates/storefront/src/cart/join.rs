//! Resolve normalized cart entries against the catalog.

use std::future::Future;

use spice_market_core::{CartLineItem, NormalizedCartEntry, Product, ProductId};
use tokio::task::JoinSet;
use tracing::debug;

use crate::gateway::GatewayError;

/// Source of single-product lookups for the joiner.
///
/// Cloned into one task per lookup.
pub trait ProductLookup: Clone + Send + Sync + 'static {
    /// `Ok(None)` when the key does not resolve.
    fn lookup(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, GatewayError>> + Send;
}

/// Build one line item per normalized entry, in entry order.
///
/// Lookups run concurrently and may finish in any order. An unresolved
/// product yields a line item with `product: None`; the entry is never
/// dropped.
///
/// # Errors
///
/// Returns the first lookup failure. Lookups still running are aborted.
pub async fn join_cart_with_products<L: ProductLookup>(
    lookup: &L,
    entries: &[NormalizedCartEntry],
) -> Result<Vec<CartLineItem>, GatewayError> {
    let mut tasks = JoinSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let lookup = lookup.clone();
        let id = entry.product_id;
        tasks.spawn(async move { (index, lookup.lookup(id).await) });
    }

    let mut resolved: Vec<Option<Product>> = vec![None; entries.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined
            .map_err(|e| GatewayError::Remote(format!("product lookup task failed: {e}")))?;
        if let Some(slot) = resolved.get_mut(index) {
            *slot = result?;
        }
    }

    let items: Vec<CartLineItem> = entries
        .iter()
        .zip(resolved)
        .map(|(entry, product)| CartLineItem {
            product_id: entry.product_id,
            product,
            quantity: entry.quantity,
        })
        .collect();

    let unavailable = items.iter().filter(|item| item.is_unavailable()).count();
    if unavailable > 0 {
        debug!(unavailable, "Cart references products that no longer resolve");
    }

    Ok(items)
}
