//! Totals shown next to the cart.

use serde::Serialize;
use spice_market_core::{CartLineItem, Price};

use super::total_quantity;

/// Subtotal and counts for a joined cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Sum of price times quantity over resolved products.
    pub subtotal: Price,
    /// Units across every line, resolved or not.
    pub item_count: u64,
    /// Lines whose product no longer resolves.
    pub unavailable: usize,
    pub lines: usize,
}

impl CartSummary {
    #[must_use]
    pub fn from_line_items(items: &[CartLineItem]) -> Self {
        Self {
            subtotal: items.iter().filter_map(CartLineItem::line_total).sum(),
            item_count: total_quantity(items.iter().map(|item| item.quantity)),
            unavailable: items.iter().filter(|item| item.is_unavailable()).count(),
            lines: items.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0
    }
}
