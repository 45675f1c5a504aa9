//! Concurrent readers, racing mutations and concurrent seeding.
//!
//! Every test runs on a paused clock against a gateway with
//! [`GATEWAY_LATENCY`] per call, so overlaps are deterministic.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use spice_market_core::{CartEntry, ProductId, SeedState};
use spice_market_integration_tests::{GATEWAY_LATENCY, slow_store};
use spice_market_storefront::cache::QueryKey;
use spice_market_storefront::seed::SeedOutcome;

#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_share_one_fetch() {
    let client = slow_store();

    let (a, b, c) = tokio::join!(client.cart(), client.cart(), client.cart());

    assert_eq!(client.gateway().calls().get_cart, 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.version, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_joins_share_lookups() {
    let client = slow_store();
    client.ensure_seeded().await;
    for id in [1, 2, 3] {
        client.set_quantity(ProductId::new(id), id).await.unwrap();
    }
    let before = client.gateway().calls();

    let (first, second) = tokio::join!(client.cart_with_products(), client.cart_with_products());

    let after = client.gateway().calls();
    assert_eq!(after.get_cart - before.get_cart, 1);
    assert_eq!(after.get_product - before.get_product, 3);
    assert_eq!(first.value, second.value);
    assert_eq!(first.value.unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_joined_lines_keep_cart_order() {
    let client = slow_store();
    client.ensure_seeded().await;
    for id in [5, 2, 6, 1] {
        client.set_quantity(ProductId::new(id), 1).await.unwrap();
    }

    let items = client.cart_with_products().await.value.unwrap();
    let ids: Vec<u64> = items.iter().map(|item| item.product_id.as_u64()).collect();
    assert_eq!(ids, vec![5, 2, 6, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_read_racing_a_mutation_is_refetched() {
    let client = slow_store();
    client.ensure_seeded().await;
    let id = ProductId::new(1);

    // The read lands before the write, the invalidation after it.
    let (raced, written) = tokio::join!(client.cart(), async {
        tokio::time::sleep(GATEWAY_LATENCY / 5).await;
        client.set_quantity(id, 4).await
    });
    written.unwrap();
    assert!(raced.value.unwrap().is_empty());

    let view = client.cart().await;
    assert_eq!(view.value, Some(vec![CartEntry::new(id, 4)]));
    assert!(view.is_fresh());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_started_before_invalidation_is_stale() {
    let client = slow_store();
    client.ensure_seeded().await;
    client.cart().await;
    client.refresh_all();

    let (view, ()) = tokio::join!(client.cart(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.cache().invalidate(QueryKey::Cart);
    });

    assert!(view.value.is_some());
    assert!(client.cache().get(QueryKey::Cart).stale);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_mutations_all_apply() {
    let client = slow_store();
    client.ensure_seeded().await;

    let (a, b, c) = tokio::join!(
        client.set_quantity(ProductId::new(1), 1),
        client.set_quantity(ProductId::new(2), 2),
        client.set_quantity(ProductId::new(3), 3),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let summary = client.cart_summary().await.unwrap();
    assert_eq!(summary.lines, 3);
    assert_eq!(summary.item_count, 6);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_seeding_creates_catalog_once() {
    let client = slow_store();
    let other = client.clone();

    let (first, second) = tokio::join!(client.ensure_seeded(), other.ensure_seeded());

    let outcomes = [first, second];
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SeedOutcome::Seeded(_)))
            .count(),
        1
    );
    assert!(outcomes.contains(&SeedOutcome::AlreadyAttempted));
    assert_eq!(client.gateway().calls().create_product, 6);
    assert_eq!(client.gateway().calls().list_products, 1);
    assert_eq!(client.seed_state(), SeedState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_mutation_refresh() {
    let client = slow_store();
    client.ensure_seeded().await;
    client.cart().await;
    let mut rx = client.subscribe(QueryKey::Cart);
    rx.borrow_and_update();

    client.set_quantity(ProductId::new(2), 1).await.unwrap();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().stale);

    client.cart().await;
    let latest = rx.borrow_and_update().clone();
    assert!(latest.is_fresh());
    assert_eq!(latest.version, 2);
}
