//! Cart records: raw gateway entries and the views derived from them.

use serde::{Deserialize, Serialize};

use super::{Price, Product, ProductId};

/// A raw cart record as returned by the gateway.
///
/// The gateway does not guarantee one entry per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    pub quantity: u64,
}

impl CartEntry {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A cart entry after merging: exactly one per product in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCartEntry {
    pub product_id: ProductId,
    pub quantity: u64,
}

/// A purchaser-facing cart row.
///
/// `product` is `None` when the referenced key no longer resolves; such rows
/// render as "unavailable" rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub product: Option<Product>,
    pub quantity: u64,
}

impl CartLineItem {
    /// Whether the referenced product could not be resolved.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        self.product.is_none()
    }

    /// Unit price times quantity, or `None` for unresolved products.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.product
            .as_ref()
            .map(|product| product.price.times(self.quantity))
    }
}
