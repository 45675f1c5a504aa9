//! Merge raw cart entries into one entry per product.

use std::collections::HashMap;

use spice_market_core::{CartEntry, NormalizedCartEntry, ProductId};

/// Sum the quantities of entries sharing a product, in first-seen order.
///
/// Zero-quantity entries are kept: an explicit zero is not the same as an
/// absent product, and removing lines is left to the mutation path.
#[must_use]
pub fn normalize_cart(entries: &[CartEntry]) -> Vec<NormalizedCartEntry> {
    let mut totals: HashMap<ProductId, u64> = HashMap::with_capacity(entries.len());
    let mut order = Vec::new();

    for entry in entries {
        let total = totals.entry(entry.product_id).or_insert_with(|| {
            order.push(entry.product_id);
            0
        });
        *total = total.saturating_add(entry.quantity);
    }

    order
        .into_iter()
        .map(|product_id| NormalizedCartEntry {
            product_id,
            quantity: totals.get(&product_id).copied().unwrap_or_default(),
        })
        .collect()
}

/// Total number of units across raw or normalized entries.
#[must_use]
pub fn total_quantity(quantities: impl IntoIterator<Item = u64>) -> u64 {
    quantities.into_iter().fold(0, u64::saturating_add)
}
