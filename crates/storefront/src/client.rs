//! Storefront client: the read views and the single write path that the
//! presentation layer consumes.
//!
//! # Views
//!
//! | View                   | Cache key                     | Source                      |
//! |------------------------|-------------------------------|-----------------------------|
//! | `all_products`         | `QueryKey::AllProducts`       | `list_products`             |
//! | `product(id)`          | `QueryKey::Product(id)`       | `get_product`               |
//! | `cart`                 | `QueryKey::Cart`              | `get_cart`                  |
//! | `normalized_cart`      | derived from `cart`           | [`normalize_cart`]          |
//! | `cart_with_products`   | `QueryKey::CartWithProducts`  | `cart` + product lookups    |
//!
//! Views are returned as [`CachedView`] snapshots: a failed refresh keeps
//! the last good value and carries the error alongside it.

use std::future::Future;
use std::sync::Arc;

use spice_market_core::{
    CartEntry, CartLineItem, NormalizedCartEntry, Product, ProductId, SeedState,
};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::cache::{CacheValue, CachedView, EntityCache, QueryKey, ViewValue};
use crate::cart::{CartSummary, ProductLookup, join_cart_with_products, normalize_cart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::gateway::{Gateway, GatewayError};
use crate::handoff::{ContactDetails, OrderConfirmation, OrderHandoff};
use crate::mutation::MutationCoordinator;
use crate::seed::{SeedCatalog, SeedGuard, SeedOutcome};

/// Client-side synchronization layer over a [`Gateway`].
///
/// Cheap to clone; clones share the cache, the seed guard and the order
/// handoff. One client is one session.
pub struct StorefrontClient<G> {
    inner: Arc<Inner<G>>,
}

struct Inner<G> {
    gateway: G,
    cache: EntityCache,
    seed: SeedGuard,
    handoff: OrderHandoff,
}

impl<G> Clone for StorefrontClient<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: Gateway> StorefrontClient<G> {
    /// Create a client that seeds the built-in catalog.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self::with_seed_catalog(gateway, SeedCatalog::default())
    }

    #[must_use]
    pub fn with_seed_catalog(gateway: G, catalog: SeedCatalog) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                cache: EntityCache::new(),
                seed: SeedGuard::new(catalog),
                handoff: OrderHandoff::new(),
            }),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    #[must_use]
    pub fn cache(&self) -> &EntityCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn seed_state(&self) -> SeedState {
        self.inner.seed.state()
    }

    #[must_use]
    pub fn handoff(&self) -> &OrderHandoff {
        &self.inner.handoff
    }

    // =========================================================================
    // Read views
    // =========================================================================

    /// The whole catalog.
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> CachedView<Vec<Product>> {
        let gateway = &self.inner.gateway;
        self.load(QueryKey::AllProducts, || gateway.list_products())
            .await
    }

    /// One product; `Some(None)` as value when the key does not resolve.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> CachedView<Option<Product>> {
        let gateway = &self.inner.gateway;
        self.load(QueryKey::Product(id), || gateway.get_product(id))
            .await
    }

    /// Raw cart entries as the gateway returns them.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> CachedView<Vec<CartEntry>> {
        let gateway = &self.inner.gateway;
        self.load(QueryKey::Cart, || gateway.get_cart()).await
    }

    /// One entry per product, quantities summed.
    pub async fn normalized_cart(&self) -> CachedView<Vec<NormalizedCartEntry>> {
        self.cart().await.map(|entries| normalize_cart(&entries))
    }

    /// Purchaser-facing line items in cart order.
    #[instrument(skip(self))]
    pub async fn cart_with_products(&self) -> CachedView<Vec<CartLineItem>> {
        self.load(QueryKey::CartWithProducts, || async {
            let gateway = &self.inner.gateway;
            let entries = self
                .inner
                .cache
                .fetch(QueryKey::Cart, || gateway.get_cart())
                .await?;
            join_cart_with_products(self, &normalize_cart(&entries)).await
        })
        .await
    }

    /// Totals for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be loaded and no earlier value
    /// is cached.
    pub async fn cart_summary(&self) -> Result<CartSummary> {
        let items = self.cart_with_products().await.into_loaded()?;
        Ok(CartSummary::from_line_items(&items))
    }

    /// Receive every change to a view's cache slot.
    #[must_use]
    pub fn subscribe(&self, key: QueryKey) -> watch::Receiver<CachedView<CacheValue>> {
        self.inner.cache.subscribe(key)
    }

    /// Mark every cached view stale.
    pub fn refresh_all(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set the quantity of a product in the cart; 0 removes it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CartUpdate`] if the gateway rejects the write.
    /// Cached views are unchanged in that case.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_quantity(&self, id: ProductId, quantity: u64) -> Result<()> {
        let id_field = id.to_string();
        let quantity_field = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Set quantity",
            Some(&[
                ("product_id", id_field.as_str()),
                ("quantity", quantity_field.as_str()),
            ]),
        );

        MutationCoordinator::new(&self.inner.gateway, &self.inner.cache)
            .set_quantity(id, quantity)
            .await
            .map_err(AppError::CartUpdate)
    }

    /// Change a product's quantity by `delta`, clamping at 0.
    ///
    /// Returns the quantity written.
    ///
    /// # Errors
    ///
    /// Returns an error if the current cart cannot be loaded or the write is
    /// rejected.
    pub async fn adjust_quantity(&self, id: ProductId, delta: i64) -> Result<u64> {
        let gateway = &self.inner.gateway;
        let entries = self
            .inner
            .cache
            .fetch(QueryKey::Cart, || gateway.get_cart())
            .await?;
        let current = normalize_cart(&entries)
            .iter()
            .find(|entry| entry.product_id == id)
            .map_or(0, |entry| entry.quantity);

        let quantity = current.saturating_add_signed(delta);
        self.set_quantity(id, quantity).await?;
        Ok(quantity)
    }

    /// Seed the catalog if this session observes it empty.
    ///
    /// Loads the catalog view first. On seeding, every view that reads the
    /// catalog is invalidated, including product lookups cached as missing,
    /// so the next read shows the new products.
    #[instrument(skip(self))]
    pub async fn ensure_seeded(&self) -> SeedOutcome {
        let products = self.all_products().await;
        let outcome = self.inner.seed.run(&self.inner.gateway, &products).await;
        if matches!(outcome, SeedOutcome::Seeded(_)) {
            self.inner.cache.invalidate_where(QueryKey::reads_catalog);
        }
        outcome
    }

    /// Place the current cart as an order and publish its confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if contact fields are missing, the cart is empty or
    /// cannot be loaded, or a previous confirmation is still pending.
    #[instrument(skip_all)]
    pub async fn checkout(&self, contact: ContactDetails) -> Result<OrderConfirmation> {
        let missing = contact.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::IncompleteContact(missing));
        }

        let items = self.cart_with_products().await.into_loaded()?;
        if items.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let summary = CartSummary::from_line_items(&items);
        let order = OrderConfirmation::new(contact, items, summary.subtotal);
        self.inner.handoff.publish(order.clone())?;

        add_breadcrumb("checkout", "Order placed", None);
        info!(
            reference = %order.reference,
            total = %order.total,
            lines = summary.lines,
            "Order placed"
        );
        Ok(order)
    }

    /// Fetch through the cache and snapshot the result.
    async fn load<T, F, Fut>(&self, key: QueryKey, loader: F) -> CachedView<T>
    where
        T: ViewValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, GatewayError>>,
    {
        let result = self.inner.cache.fetch(key, loader).await;
        if let Err(err) = &result
            && !err.is_unavailable()
        {
            warn!(%key, error = %err, "Failed to load view");
        }
        self.inner.cache.view::<T>(key).with_result(result)
    }
}

impl<G: Gateway> ProductLookup for StorefrontClient<G> {
    async fn lookup(&self, id: ProductId) -> std::result::Result<Option<Product>, GatewayError> {
        let gateway = &self.inner.gateway;
        self.inner
            .cache
            .fetch(QueryKey::Product(id), || gateway.get_product(id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use spice_market_core::{Email, ViewStatus};

    use super::*;
    use crate::gateway::{InMemoryGateway, Operation};

    async fn seeded_client() -> StorefrontClient<InMemoryGateway> {
        let client = StorefrontClient::new(InMemoryGateway::new());
        client.ensure_seeded().await;
        client
    }

    fn contact() -> ContactDetails {
        ContactDetails {
            name: "Asha Rao".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            phone: "555-0100".to_string(),
            street: "12 Market St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_seeded_refreshes_catalog() {
        let client = StorefrontClient::new(InMemoryGateway::new());

        assert!(matches!(client.ensure_seeded().await, SeedOutcome::Seeded(_)));
        assert_eq!(client.seed_state(), SeedState::Done);

        let products = client.all_products().await;
        assert_eq!(products.value.unwrap().len(), 6);
        assert_eq!(client.gateway().calls().list_products, 2);
    }

    #[tokio::test]
    async fn test_product_view_for_missing_key() {
        let client = seeded_client().await;
        let view = client.product(ProductId::new(99)).await;
        assert_eq!(view.status(), ViewStatus::Ready);
        assert_eq!(view.value, Some(None));
    }

    #[tokio::test]
    async fn test_set_quantity_refreshes_cart_views() {
        let client = seeded_client().await;
        assert!(client.cart_with_products().await.value.unwrap().is_empty());

        client.set_quantity(ProductId::new(1), 3).await.unwrap();

        let items = client.cart_with_products().await.value.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].product.as_ref().unwrap().name, "Turmeric Powder");
    }

    #[tokio::test]
    async fn test_failed_set_quantity_keeps_cart_view() {
        let client = seeded_client().await;
        client.set_quantity(ProductId::new(2), 1).await.unwrap();
        let before = client.cart().await;

        client.gateway().fail_next(Operation::SetCartQuantity);
        let err = client.set_quantity(ProductId::new(2), 5).await.unwrap_err();
        assert!(matches!(err, AppError::CartUpdate(_)));
        assert_eq!(err.user_message(), "Failed to update cart");

        let after = client.cart().await;
        assert_eq!(after, before);
        assert_eq!(client.gateway().calls().get_cart, 1);
    }

    #[tokio::test]
    async fn test_adjust_quantity_clamps_at_zero() {
        let client = seeded_client().await;
        let id = ProductId::new(3);

        assert_eq!(client.adjust_quantity(id, 2).await.unwrap(), 2);
        assert_eq!(client.adjust_quantity(id, 1).await.unwrap(), 3);
        assert_eq!(client.adjust_quantity(id, -10).await.unwrap(), 0);
        assert!(client.gateway().cart_entries().is_empty());
    }

    #[tokio::test]
    async fn test_normalized_cart_merges_raw_duplicates() {
        let client = seeded_client().await;
        client
            .gateway()
            .push_raw_cart_entry(CartEntry::new(ProductId::new(1), 2));
        client
            .gateway()
            .push_raw_cart_entry(CartEntry::new(ProductId::new(1), 3));

        let normalized = client.normalized_cart().await.value.unwrap();
        assert_eq!(
            normalized,
            vec![NormalizedCartEntry {
                product_id: ProductId::new(1),
                quantity: 5
            }]
        );
    }

    #[tokio::test]
    async fn test_checkout_publishes_handoff() {
        let client = seeded_client().await;
        client.set_quantity(ProductId::new(1), 2).await.unwrap();

        let order = client.checkout(contact()).await.unwrap();
        assert_eq!(order.total.cents(), 1798);

        let pending = client.handoff().take().unwrap();
        assert_eq!(pending.reference, order.reference);
        assert!(client.handoff().take().is_none());
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_blank_fields() {
        let client = seeded_client().await;
        assert!(matches!(
            client.checkout(contact()).await,
            Err(AppError::EmptyCart)
        ));

        let mut incomplete = contact();
        incomplete.street.clear();
        assert!(matches!(
            client.checkout(incomplete).await,
            Err(AppError::IncompleteContact(fields)) if fields == vec!["street"]
        ));
    }

    #[tokio::test]
    async fn test_offline_gateway_renders_loading() {
        let client = StorefrontClient::new(InMemoryGateway::new());
        client.gateway().set_offline(true);

        let view = client.all_products().await;
        assert_eq!(view.status(), ViewStatus::Loading);
        assert_eq!(client.ensure_seeded().await, SeedOutcome::CatalogNotReady);
        assert_eq!(client.seed_state(), SeedState::Unattempted);
    }
}
