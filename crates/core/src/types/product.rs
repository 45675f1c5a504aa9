//! Catalog product records.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as stored by the gateway.
///
/// Immutable from the client's perspective; only the gateway assigns ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Gateway-assigned key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Whether the product can currently be purchased.
    pub available: bool,
    /// Image reference (file name or URL, resolved by the presentation layer).
    pub image_url: String,
    /// Unit price in minor currency units.
    pub price: Price,
}

/// Input for creating a product.
///
/// Also the record format of seed catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

impl NewProduct {
    /// Attach a gateway-assigned id, producing the stored product.
    #[must_use]
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            available: self.available,
            image_url: self.image_url,
            price: self.price,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_format_is_camel_case() {
        let product = Product {
            id: ProductId::new(1),
            name: "Cumin Seeds".to_string(),
            description: "Warm and earthy".to_string(),
            available: true,
            image_url: "cumin-seeds.png".to_string(),
            price: Price::from_cents(649),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["imageUrl"], "cumin-seeds.png");
        assert_eq!(json["price"], 649);
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_new_product_defaults_to_available() {
        let input: NewProduct = serde_json::from_str(
            r#"{"name":"Mace","description":"d","price":100,"imageUrl":"mace.png"}"#,
        )
        .unwrap();
        assert!(input.available);

        let product = input.into_product(ProductId::new(5));
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.name, "Mace");
    }
}
