//! End-to-end storefront flows against the in-process gateway.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use spice_market_core::{CartEntry, NormalizedCartEntry, ProductId, SeedState, ViewStatus};
use spice_market_integration_tests::empty_store;
use spice_market_storefront::cache::QueryKey;
use spice_market_storefront::gateway::Operation;
use spice_market_storefront::seed::SeedOutcome;

#[tokio::test]
async fn test_seed_then_add_to_cart() {
    let client = empty_store();

    let outcome = client.ensure_seeded().await;
    assert!(matches!(outcome, SeedOutcome::Seeded(ref r) if r.created.len() == 6));

    let products = client.all_products().await.into_loaded().unwrap();
    assert_eq!(products.len(), 6);

    let cart = client.cart().await.into_loaded().unwrap();
    assert!(cart.is_empty());

    let first = &products[0];
    client.set_quantity(first.id, 3).await.unwrap();

    let cart = client.cart().await.into_loaded().unwrap();
    assert_eq!(cart, vec![CartEntry::new(first.id, 3)]);

    let items = client.cart_with_products().await.into_loaded().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].product.as_ref(), Some(first));
}

#[tokio::test]
async fn test_raw_duplicates_normalize_in_first_seen_order() {
    let client = empty_store();
    let (p1, p2) = (ProductId::new(1), ProductId::new(2));
    for entry in [
        CartEntry::new(p1, 2),
        CartEntry::new(p1, 3),
        CartEntry::new(p2, 1),
    ] {
        client.gateway().push_raw_cart_entry(entry);
    }

    let normalized = client.normalized_cart().await.into_loaded().unwrap();
    assert_eq!(
        normalized,
        vec![
            NormalizedCartEntry {
                product_id: p1,
                quantity: 5
            },
            NormalizedCartEntry {
                product_id: p2,
                quantity: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_set_quantity_zero_removes_line() {
    let client = empty_store();
    client.ensure_seeded().await;
    let id = ProductId::new(2);

    client.set_quantity(id, 4).await.unwrap();
    client.set_quantity(ProductId::new(5), 1).await.unwrap();
    client.set_quantity(id, 0).await.unwrap();

    let normalized = client.normalized_cart().await.into_loaded().unwrap();
    assert!(normalized.iter().all(|entry| entry.product_id != id));
    assert_eq!(normalized.len(), 1);
}

#[tokio::test]
async fn test_deleted_product_shows_as_unavailable() {
    let client = empty_store();
    client.ensure_seeded().await;
    client.set_quantity(ProductId::new(1), 1).await.unwrap();
    client.set_quantity(ProductId::new(4), 2).await.unwrap();
    client.gateway().remove_product(ProductId::new(4));

    let items = client.cart_with_products().await.into_loaded().unwrap();
    assert_eq!(items.len(), 2);
    assert!(!items[0].is_unavailable());
    assert!(items[1].is_unavailable());
    assert_eq!(items[1].quantity, 2);

    let summary = client.cart_summary().await.unwrap();
    assert_eq!(summary.unavailable, 1);
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.subtotal.cents(), 899);
}

#[tokio::test]
async fn test_seed_guard_runs_once_per_session() {
    let client = empty_store();

    assert!(matches!(client.ensure_seeded().await, SeedOutcome::Seeded(_)));
    for product in client.gateway().products() {
        client.gateway().remove_product(product.id);
    }
    client.refresh_all();

    assert!(client.all_products().await.value.unwrap().is_empty());
    assert_eq!(client.ensure_seeded().await, SeedOutcome::AlreadyAttempted);
    assert_eq!(client.seed_state(), SeedState::Done);
    assert_eq!(client.gateway().calls().create_product, 6);
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_good_value() {
    let client = empty_store();
    client.ensure_seeded().await;
    let products = client.all_products().await;
    assert_eq!(products.status(), ViewStatus::Ready);

    client.refresh_all();
    client.gateway().fail_next(Operation::ListProducts);

    let view = client.all_products().await;
    assert_eq!(view.status(), ViewStatus::Ready);
    assert_eq!(view.value, products.value);
    assert!(view.error.is_some());

    let retried = client.all_products().await;
    assert!(retried.error.is_none());
    assert!(retried.is_fresh());
}

#[tokio::test]
async fn test_failed_mutation_leaves_cart_unchanged() {
    let client = empty_store();
    client.ensure_seeded().await;
    client.set_quantity(ProductId::new(1), 2).await.unwrap();
    let before = client.cart_with_products().await.into_loaded().unwrap();

    client.gateway().fail_next(Operation::SetCartQuantity);
    let err = client.set_quantity(ProductId::new(1), 9).await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to update cart");

    let after = client.cart_with_products().await.into_loaded().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_product_viewed_before_seeding_resolves_after() {
    let client = empty_store();
    let id = ProductId::new(1);

    assert_eq!(client.product(id).await.value, Some(None));
    client.gateway().push_raw_cart_entry(CartEntry::new(id, 1));
    let before = client.cart_with_products().await.into_loaded().unwrap();
    assert!(before[0].is_unavailable());

    assert!(matches!(client.ensure_seeded().await, SeedOutcome::Seeded(_)));

    let product = client.product(id).await.into_loaded().unwrap();
    assert_eq!(product.unwrap().name, "Turmeric Powder");

    let items = client.cart_with_products().await.into_loaded().unwrap();
    assert!(!items[0].is_unavailable());

    client.set_quantity(id, 3).await.unwrap();
    let items = client.cart_with_products().await.into_loaded().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].product.as_ref().map(|p| p.id), Some(id));
}

#[tokio::test]
async fn test_seeding_keeps_raw_cart_cached() {
    let client = empty_store();
    client.cart().await;

    client.ensure_seeded().await;

    assert!(client.cache().get(QueryKey::Cart).is_fresh());
    assert!(client.cache().get(QueryKey::AllProducts).stale);
    assert_eq!(client.gateway().calls().get_cart, 1);
}
