//! Cart views derived from raw gateway entries.
//!
//! Raw entries are first merged per product ([`normalize_cart`]), then
//! resolved against the catalog ([`join_cart_with_products`]).

mod join;
mod normalize;
mod summary;

pub use join::{ProductLookup, join_cart_with_products};
pub use normalize::{normalize_cart, total_quantity};
pub use summary::CartSummary;
