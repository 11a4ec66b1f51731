//! # Edition Assignment Properties
//!
//! End-to-end checks through the service with the in-memory adapters.
//!
//! ## Test Categories
//!
//! 1. **Numbering** - uniqueness, gap closure, reserved-number skipping
//! 2. **Claims** - claimed numbers survive every rerun
//! 3. **Capacity** - oversell fails without partial writes
//! 4. **Open editions** - unbounded, no total
//! 5. **Stability** - idempotent reruns, concurrent callers

use chrono::{DateTime, TimeZone, Utc};
use edition_assignment::domain::invariants::{
    invariant_claims_frozen, invariant_gap_free, invariant_unique_editions,
};
use edition_assignment::{
    EditionAssignmentApi, EditionAssignmentService, EditionConfig, InMemoryEditionStore,
    InMemoryProductLocks, LineItem, LineItemId, LineItemLifecycleApi, LineItemStore, Product,
    ProductId,
};
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

type Service =
    EditionAssignmentService<InMemoryEditionStore, InMemoryEditionStore, InMemoryProductLocks>;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn product_id() -> ProductId {
    ProductId::new("artwork-42")
}

fn make_service(edition_size: Option<u32>) -> (Arc<Service>, Arc<InMemoryEditionStore>) {
    let store = Arc::new(InMemoryEditionStore::new());
    store.upsert_product(Product::new(product_id(), edition_size).with_title("Night Harbour"));
    let service = EditionAssignmentService::new(
        store.clone(),
        store.clone(),
        Arc::new(InMemoryProductLocks::new()),
        EditionConfig::default(),
    );
    (Arc::new(service), store)
}

async fn add(store: &InMemoryEditionStore, item: LineItem) {
    store.insert_line_item(item).await.unwrap();
}

async fn add_fresh(store: &InMemoryEditionStore, id: &str, secs: i64) {
    add(store, LineItem::new(LineItemId::new(id), product_id(), at(secs))).await;
}

async fn items(store: &InMemoryEditionStore) -> Vec<LineItem> {
    store.line_items_for_product(&product_id()).await.unwrap()
}

async fn numbering(store: &InMemoryEditionStore) -> HashMap<String, Option<u32>> {
    items(store)
        .await
        .into_iter()
        .map(|item| (item.id.to_string(), item.edition_number))
        .collect()
}

async fn number(store: &InMemoryEditionStore, id: &str) -> Option<u32> {
    store
        .get_line_item(&LineItemId::new(id))
        .await
        .unwrap()
        .and_then(|item| item.edition_number)
}

// =============================================================================
// NUMBERING
// =============================================================================

#[tokio::test]
async fn uniqueness_holds_after_messy_history() {
    let (service, store) = make_service(Some(20));

    // Stale, colliding numbers from an earlier buggy import
    add(
        &store,
        LineItem::new(LineItemId::new("a"), product_id(), at(0)).with_edition(1, Some(20)),
    )
    .await;
    add(
        &store,
        LineItem::new(LineItemId::new("b"), product_id(), at(1)).with_edition(1, Some(20)),
    )
    .await;
    add(
        &store,
        LineItem::new(LineItemId::new("c"), product_id(), at(2))
            .with_edition(4, Some(20))
            .with_claim(at(10)),
    )
    .await;
    add_fresh(&store, "d", 3).await;

    service.assign_editions(&product_id()).await.unwrap();

    let after = items(&store).await;
    assert!(invariant_unique_editions(&after));
    assert!(invariant_gap_free(&after));
}

#[tokio::test]
async fn gap_closes_after_deactivation() {
    let (service, store) = make_service(Some(10));
    add_fresh(&store, "A", 0).await;
    add_fresh(&store, "B", 1).await;
    add_fresh(&store, "C", 2).await;

    service.assign_editions(&product_id()).await.unwrap();
    assert_eq!(number(&store, "A").await, Some(1));
    assert_eq!(number(&store, "B").await, Some(2));
    assert_eq!(number(&store, "C").await, Some(3));

    service.deactivate(&LineItemId::new("B")).await.unwrap();

    assert_eq!(number(&store, "A").await, Some(1));
    assert_eq!(number(&store, "B").await, None);
    assert_eq!(number(&store, "C").await, Some(2));
}

#[tokio::test]
async fn reserved_number_is_skipped() {
    let (service, store) = make_service(Some(10));
    add(
        &store,
        LineItem::new(LineItemId::new("claimed"), product_id(), at(0))
            .with_edition(2, Some(10))
            .with_claim(at(5)),
    )
    .await;
    add_fresh(&store, "first", 10).await;
    add_fresh(&store, "second", 20).await;

    let report = service.assign_editions(&product_id()).await.unwrap();

    assert_eq!(report.reserved, 1);
    assert_eq!(number(&store, "claimed").await, Some(2));
    assert_eq!(number(&store, "first").await, Some(1));
    assert_eq!(number(&store, "second").await, Some(3));
}

// =============================================================================
// CLAIMS
// =============================================================================

#[tokio::test]
async fn claimed_numbers_survive_reruns_and_cancellations() {
    let (service, store) = make_service(Some(10));
    for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        add_fresh(&store, id, i as i64).await;
    }
    service.assign_editions(&product_id()).await.unwrap();

    service.claim(&LineItemId::new("d"), at(100)).await.unwrap();
    let before = items(&store).await;

    service.deactivate(&LineItemId::new("a")).await.unwrap();
    service.deactivate(&LineItemId::new("b")).await.unwrap();
    add_fresh(&store, "f", 50).await;
    service.assign_editions(&product_id()).await.unwrap();

    let after = items(&store).await;
    assert!(invariant_claims_frozen(&before, &after));
    assert_eq!(number(&store, "d").await, Some(4));
    // c=1, e=2, f=3 fill around the frozen 4
    assert_eq!(number(&store, "c").await, Some(1));
    assert_eq!(number(&store, "e").await, Some(2));
    assert_eq!(number(&store, "f").await, Some(3));
}

// =============================================================================
// CAPACITY
// =============================================================================

#[tokio::test]
async fn oversell_fails_and_no_item_holds_three() {
    let (service, store) = make_service(Some(2));
    add_fresh(&store, "x", 0).await;
    add_fresh(&store, "y", 1).await;
    add_fresh(&store, "z", 2).await;

    let err = service.assign_editions(&product_id()).await.unwrap_err();

    assert!(err.is_capacity_exceeded());
    assert!(items(&store)
        .await
        .iter()
        .all(|item| item.edition_number != Some(3)));
}

#[tokio::test]
async fn oversell_keeps_previous_numbering_intact() {
    let (service, store) = make_service(Some(2));
    add_fresh(&store, "x", 0).await;
    add_fresh(&store, "y", 1).await;
    service.assign_editions(&product_id()).await.unwrap();
    let before = numbering(&store).await;

    let err = service
        .record_purchase(LineItem::new(LineItemId::new("z"), product_id(), at(2)))
        .await
        .unwrap_err();

    assert!(err.is_capacity_exceeded());
    let mut after = numbering(&store).await;
    assert_eq!(after.remove("z"), Some(None));
    assert_eq!(after, before);
}

// =============================================================================
// OPEN EDITIONS
// =============================================================================

#[tokio::test]
async fn open_edition_is_unbounded_without_total() {
    for size in [None, Some(0)] {
        let (service, store) = make_service(size);
        for i in 0..1_000 {
            add_fresh(&store, &format!("li-{:04}", i), i).await;
        }

        let report = service.assign_editions(&product_id()).await.unwrap();

        assert_eq!(report.assigned, 1_000);
        let all = items(&store).await;
        assert!(all.iter().all(|item| item.edition_total.is_none()));
        assert_eq!(number(&store, "li-0999").await, Some(1_000));
    }
}

// =============================================================================
// STABILITY
// =============================================================================

#[tokio::test]
async fn rerun_on_stable_input_is_identical() {
    let (service, store) = make_service(Some(8));
    add(
        &store,
        LineItem::new(LineItemId::new("k"), product_id(), at(0))
            .with_edition(5, Some(8))
            .with_claim(at(1)),
    )
    .await;
    for (i, id) in ["p", "q", "r"].iter().enumerate() {
        add_fresh(&store, id, 10 + i as i64).await;
    }

    service.assign_editions(&product_id()).await.unwrap();
    let first = numbering(&store).await;
    let second_report = service.assign_editions(&product_id()).await.unwrap();
    let second = numbering(&store).await;

    assert_eq!(first, second);
    assert_eq!(second_report.renumbered, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_never_collide() {
    let (service, _store) = make_service(None);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_purchase(LineItem::new(
                        LineItemId::new(format!("order-{:02}", i)),
                        product_id(),
                        at(i),
                    ))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let report = service.verify_editions(&product_id()).await.unwrap();
    assert!(report.is_clean(), "violations: {:?}", report.violations);
    assert_eq!(report.active_items, 32);
}
