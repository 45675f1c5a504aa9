//! Cache keys and the values stored under them.

use std::fmt;

use spice_market_core::{CartEntry, CartLineItem, Product, ProductId};

/// Identity of a cached query.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum QueryKey {
    AllProducts,
    Product(ProductId),
    Cart,
    CartWithProducts,
}

impl QueryKey {
    /// Whether the view depends on catalog contents. The raw cart does not.
    #[must_use]
    pub const fn reads_catalog(self) -> bool {
        !matches!(self, Self::Cart)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllProducts => f.write_str("products"),
            Self::Product(id) => write!(f, "product:{id}"),
            Self::Cart => f.write_str("cart"),
            Self::CartWithProducts => f.write_str("cart-with-products"),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Option<Product>),
    Cart(Vec<CartEntry>),
    CartWithProducts(Vec<CartLineItem>),
}

/// A type that can be stored in the cache.
///
/// `from_cache` returns `None` when the stored variant belongs to another
/// type, which only happens if a key is read with the wrong value type.
pub trait ViewValue: Clone + Send + Sync + 'static {
    fn from_cache(value: &CacheValue) -> Option<Self>;
    fn into_cache(self) -> CacheValue;
}

impl ViewValue for Vec<Product> {
    fn from_cache(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::Products(products) => Some(products.clone()),
            _ => None,
        }
    }

    fn into_cache(self) -> CacheValue {
        CacheValue::Products(self)
    }
}

impl ViewValue for Option<Product> {
    fn from_cache(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::Product(product) => Some(product.clone()),
            _ => None,
        }
    }

    fn into_cache(self) -> CacheValue {
        CacheValue::Product(self)
    }
}

impl ViewValue for Vec<CartEntry> {
    fn from_cache(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::Cart(entries) => Some(entries.clone()),
            _ => None,
        }
    }

    fn into_cache(self) -> CacheValue {
        CacheValue::Cart(self)
    }
}

impl ViewValue for Vec<CartLineItem> {
    fn from_cache(value: &CacheValue) -> Option<Self> {
        match value {
            CacheValue::CartWithProducts(items) => Some(items.clone()),
            _ => None,
        }
    }

    fn into_cache(self) -> CacheValue {
        CacheValue::CartWithProducts(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_key_display() {
        assert_eq!(QueryKey::AllProducts.to_string(), "products");
        assert_eq!(QueryKey::Product(ProductId::new(3)).to_string(), "product:3");
        assert_eq!(QueryKey::CartWithProducts.to_string(), "cart-with-products");
    }

    #[test]
    fn test_reads_catalog() {
        assert!(QueryKey::AllProducts.reads_catalog());
        assert!(QueryKey::Product(ProductId::new(1)).reads_catalog());
        assert!(QueryKey::CartWithProducts.reads_catalog());
        assert!(!QueryKey::Cart.reads_catalog());
    }

    #[test]
    fn test_view_value_rejects_other_variant() {
        let value = Vec::<CartEntry>::new().into_cache();
        assert_eq!(Vec::<CartEntry>::from_cache(&value), Some(Vec::new()));
        assert_eq!(Vec::<Product>::from_cache(&value), None);
    }
}
