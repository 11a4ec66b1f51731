//! Edition Assignment Service
//!
//! Main service implementing `EditionAssignmentApi` and `LineItemLifecycleApi`.

use crate::algorithms::plan_assignment;
use crate::config::EditionConfig;
use crate::domain::entities::{
    AssignmentPlan, AssignmentReport, IntegrityReport, LineItem, Product,
};
use crate::domain::errors::{AssignmentError, AssignmentResult};
use crate::domain::invariants::audit;
use crate::domain::value_objects::{EditionKind, LineItemId, LineItemStatus, ProductId};
use crate::ports::inbound::{EditionAssignmentApi, LineItemLifecycleApi};
use crate::ports::outbound::{LineItemStore, ProductCatalog, ProductLockManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edition_telemetry::{
    record_assignment, AssignmentOutcome, HistogramTimer, ASSIGNMENT_DURATION,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Edition Assignment Service
///
/// Orchestrates one assignment run:
/// 1. Take the per-product lock (bounded wait)
/// 2. Load the product (missing → open edition unless strict)
/// 3. Load its line items and enforce the active set cap
/// 4. Plan the numbering
/// 5. Apply every write in one atomic batch
pub struct EditionAssignmentService<C, S, L>
where
    C: ProductCatalog,
    S: LineItemStore,
    L: ProductLockManager,
{
    catalog: Arc<C>,
    store: Arc<S>,
    locks: Arc<L>,
    config: EditionConfig,
}

impl<C, S, L> EditionAssignmentService<C, S, L>
where
    C: ProductCatalog,
    S: LineItemStore,
    L: ProductLockManager,
{
    pub fn new(catalog: Arc<C>, store: Arc<S>, locks: Arc<L>, config: EditionConfig) -> Self {
        Self {
            catalog,
            store,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &EditionConfig {
        &self.config
    }

    /// Assign every product that currently has active line items.
    pub async fn assign_all(
        &self,
    ) -> AssignmentResult<Vec<(ProductId, AssignmentResult<AssignmentReport>)>> {
        let product_ids = self.store.product_ids_with_active_items().await?;
        Ok(self.assign_many(&product_ids).await)
    }

    async fn lock_product(&self, product_id: &ProductId) -> AssignmentResult<L::Guard> {
        let timeout = self.config.lock_timeout();
        match tokio::time::timeout(timeout, self.locks.acquire(product_id)).await {
            Ok(guard) => Ok(guard?),
            Err(_) => {
                warn!(
                    product_id = %product_id,
                    waited_ms = self.config.lock_timeout_ms,
                    "[editions] Product lock wait timed out"
                );
                Err(AssignmentError::LockTimeout {
                    product_id: product_id.clone(),
                    waited_ms: self.config.lock_timeout_ms,
                })
            }
        }
    }

    async fn load_product(&self, product_id: &ProductId) -> AssignmentResult<Option<Product>> {
        let product = self.catalog.find_product(product_id).await?;
        if product.is_none() {
            if self.config.strict_product_lookup {
                return Err(AssignmentError::ProductNotFound(product_id.clone()));
            }
            warn!(
                product_id = %product_id,
                "[editions] No product record, numbering as open edition"
            );
        }
        Ok(product)
    }

    async fn plan_for(&self, product_id: &ProductId) -> AssignmentResult<AssignmentPlan> {
        let product = self.load_product(product_id).await?;
        let items = self.store.line_items_for_product(product_id).await?;

        let active = items.iter().filter(|item| item.is_active()).count();
        if active > self.config.max_line_items_per_product {
            return Err(AssignmentError::TooManyLineItems {
                count: active,
                max: self.config.max_line_items_per_product,
            });
        }

        plan_assignment(product_id, product.as_ref(), &items)
    }

    /// One assignment run. The caller must hold the product lock.
    async fn assign_locked(&self, product_id: &ProductId) -> AssignmentResult<AssignmentReport> {
        let _timer = HistogramTimer::new(&ASSIGNMENT_DURATION);

        let result = self.run_plan(product_id).await;
        match &result {
            Ok(report) => {
                record_assignment(AssignmentOutcome::Success, report.assigned);
                info!(
                    product_id = %product_id,
                    assigned = report.assigned,
                    renumbered = report.renumbered,
                    reserved = report.reserved,
                    "[editions] Edition numbers assigned"
                );
            }
            Err(e) if e.is_capacity_exceeded() => {
                record_assignment(AssignmentOutcome::CapacityExceeded, 0);
                error!(product_id = %product_id, "[editions] ❌ Oversold: {}", e);
            }
            Err(e) => {
                record_assignment(AssignmentOutcome::Failed, 0);
                error!(product_id = %product_id, "[editions] ❌ Assignment failed: {}", e);
            }
        }
        result
    }

    async fn run_plan(&self, product_id: &ProductId) -> AssignmentResult<AssignmentReport> {
        let plan = self.plan_for(product_id).await?;

        debug!(
            product_id = %product_id,
            writes = plan.writes.len(),
            changed = plan.changed().count(),
            highest = ?plan.highest_number(),
            "[editions] Plan computed"
        );

        if !plan.writes.is_empty() {
            self.store
                .apply_edition_writes(product_id, &plan.writes)
                .await?;
        }

        Ok(AssignmentReport::from_plan(&plan))
    }

    async fn find_line_item(&self, line_item_id: &LineItemId) -> AssignmentResult<LineItem> {
        self.store
            .get_line_item(line_item_id)
            .await?
            .ok_or_else(|| AssignmentError::LineItemNotFound(line_item_id.clone()))
    }
}

#[async_trait]
impl<C, S, L> EditionAssignmentApi for EditionAssignmentService<C, S, L>
where
    C: ProductCatalog,
    S: LineItemStore,
    L: ProductLockManager,
{
    async fn assign_editions(&self, product_id: &ProductId) -> AssignmentResult<AssignmentReport> {
        let _guard = self.lock_product(product_id).await?;
        self.assign_locked(product_id).await
    }

    async fn preview_assignment(&self, product_id: &ProductId) -> AssignmentResult<AssignmentPlan> {
        self.plan_for(product_id).await
    }

    async fn verify_editions(&self, product_id: &ProductId) -> AssignmentResult<IntegrityReport> {
        let kind = self
            .load_product(product_id)
            .await?
            .map(|p| p.edition_kind())
            .unwrap_or(EditionKind::Open);
        let items = self.store.line_items_for_product(product_id).await?;

        let report = audit(product_id, kind, &items);
        if !report.is_clean() {
            warn!(
                product_id = %product_id,
                violations = report.violations.len(),
                "[editions] Integrity audit found violations"
            );
        }
        Ok(report)
    }

    async fn assign_many(
        &self,
        product_ids: &[ProductId],
    ) -> Vec<(ProductId, AssignmentResult<AssignmentReport>)> {
        let mut results = Vec::with_capacity(product_ids.len());
        for product_id in product_ids {
            let result = self.assign_editions(product_id).await;
            results.push((product_id.clone(), result));
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            products = results.len(),
            failed, "[editions] Batch assignment complete"
        );
        results
    }
}

#[async_trait]
impl<C, S, L> LineItemLifecycleApi for EditionAssignmentService<C, S, L>
where
    C: ProductCatalog,
    S: LineItemStore,
    L: ProductLockManager,
{
    async fn record_purchase(&self, mut item: LineItem) -> AssignmentResult<AssignmentReport> {
        // A purchase starts active and unclaimed; numbering is ours to decide
        if !item.is_active() {
            return Err(AssignmentError::InactiveLineItem(item.id));
        }
        if item.is_claimed() {
            return Err(AssignmentError::AlreadyClaimed(item.id));
        }
        if item.edition_number.is_some() || item.edition_total.is_some() {
            warn!(
                line_item_id = %item.id,
                edition_number = ?item.edition_number,
                "[editions] Discarding caller-supplied edition on new purchase"
            );
            item.edition_number = None;
            item.edition_total = None;
        }

        let product_id = item.product_id.clone();
        let _guard = self.lock_product(&product_id).await?;

        debug!(
            line_item_id = %item.id,
            product_id = %product_id,
            "[editions] Recording purchase"
        );
        self.store.insert_line_item(item).await?;
        self.assign_locked(&product_id).await
    }

    async fn deactivate(&self, line_item_id: &LineItemId) -> AssignmentResult<AssignmentReport> {
        let product_id = self.find_line_item(line_item_id).await?.product_id;
        let _guard = self.lock_product(&product_id).await?;

        // Re-read under the lock
        let mut item = self.find_line_item(line_item_id).await?;
        if item.is_active() || item.edition_number.is_some() {
            if item.is_claimed() {
                warn!(
                    line_item_id = %line_item_id,
                    edition_number = ?item.edition_number,
                    "[editions] Deactivating a claimed item releases its number"
                );
            }
            item.status = LineItemStatus::Inactive;
            item.edition_number = None;
            item.edition_total = None;
            self.store.update_line_item(item).await?;
        }

        self.assign_locked(&product_id).await
    }

    async fn claim(
        &self,
        line_item_id: &LineItemId,
        claimed_at: DateTime<Utc>,
    ) -> AssignmentResult<LineItem> {
        let product_id = self.find_line_item(line_item_id).await?.product_id;
        let _guard = self.lock_product(&product_id).await?;

        let mut item = self.find_line_item(line_item_id).await?;
        if !item.is_active() {
            return Err(AssignmentError::InactiveLineItem(line_item_id.clone()));
        }
        if item.edition_number.is_none() {
            return Err(AssignmentError::NotAssigned(line_item_id.clone()));
        }
        if item.is_claimed() {
            return Err(AssignmentError::AlreadyClaimed(line_item_id.clone()));
        }

        item.nfc_claimed_at = Some(claimed_at);
        self.store.update_line_item(item.clone()).await?;

        info!(
            line_item_id = %line_item_id,
            product_id = %product_id,
            edition_number = ?item.edition_number,
            "[editions] Edition claimed"
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEditionStore, InMemoryProductLocks};
    use chrono::TimeZone;

    type TestService =
        EditionAssignmentService<InMemoryEditionStore, InMemoryEditionStore, InMemoryProductLocks>;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn pid() -> ProductId {
        ProductId::new("print-1")
    }

    struct Fixture {
        service: TestService,
        store: Arc<InMemoryEditionStore>,
        locks: Arc<InMemoryProductLocks>,
    }

    fn setup(product: Option<Product>, config: EditionConfig) -> Fixture {
        let store = Arc::new(InMemoryEditionStore::new());
        if let Some(product) = product {
            store.upsert_product(product);
        }
        let locks = Arc::new(InMemoryProductLocks::new());
        let service =
            EditionAssignmentService::new(store.clone(), store.clone(), locks.clone(), config);
        Fixture {
            service,
            store,
            locks,
        }
    }

    fn limited(size: u32) -> Option<Product> {
        Some(Product::new(pid(), Some(size)))
    }

    fn open() -> Option<Product> {
        Some(Product::new(pid(), None))
    }

    async fn seed(store: &InMemoryEditionStore, ids: &[&str]) {
        for (i, id) in ids.iter().enumerate() {
            store
                .insert_line_item(LineItem::new(LineItemId::new(*id), pid(), at(i as i64)))
                .await
                .unwrap();
        }
    }

    fn number_of(store: &InMemoryEditionStore, id: &str) -> Option<u32> {
        store
            .snapshot()
            .line_item(&LineItemId::new(id))
            .and_then(|item| item.edition_number)
    }

    #[tokio::test]
    async fn test_assign_numbers_oldest_first() {
        let Fixture { service, store, .. } = setup(limited(5), EditionConfig::default());
        seed(&store, &["a", "b", "c"]).await;

        let report = service.assign_editions(&pid()).await.unwrap();

        assert_eq!(report.assigned, 3);
        assert_eq!(number_of(&store, "a"), Some(1));
        assert_eq!(number_of(&store, "c"), Some(3));
    }

    #[tokio::test]
    async fn test_oversell_writes_nothing() {
        let Fixture { service, store, .. } = setup(limited(2), EditionConfig::default());
        seed(&store, &["a", "b", "c"]).await;

        let err = service.assign_editions(&pid()).await.unwrap_err();

        assert!(err.is_capacity_exceeded());
        assert_eq!(number_of(&store, "a"), None);
        assert_eq!(number_of(&store, "b"), None);
    }

    #[tokio::test]
    async fn test_strict_lookup_rejects_missing_product() {
        let config = EditionConfig {
            strict_product_lookup: true,
            ..Default::default()
        };
        let Fixture { service, store, .. } = setup(None, config);
        seed(&store, &["a"]).await;

        let err = service.assign_editions(&pid()).await.unwrap_err();
        assert!(matches!(err, AssignmentError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_lenient_lookup_numbers_as_open() {
        let Fixture { service, store, .. } = setup(None, EditionConfig::default());
        seed(&store, &["a", "b"]).await;

        let report = service.assign_editions(&pid()).await.unwrap();

        assert_eq!(report.kind, EditionKind::Open);
        let snapshot = store.snapshot();
        let item = snapshot.line_item(&LineItemId::new("b")).unwrap();
        assert_eq!(item.edition_number, Some(2));
        assert_eq!(item.edition_total, None);
    }

    #[tokio::test]
    async fn test_active_set_cap() {
        let config = EditionConfig {
            max_line_items_per_product: 2,
            ..Default::default()
        };
        let Fixture { service, store, .. } = setup(open(), config);
        seed(&store, &["a", "b", "c"]).await;

        let err = service.assign_editions(&pid()).await.unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::TooManyLineItems { count: 3, max: 2 }
        ));
    }

    #[tokio::test]
    async fn test_lock_timeout() {
        let config = EditionConfig {
            lock_timeout_ms: 20,
            ..Default::default()
        };
        let Fixture {
            service,
            store,
            locks,
        } = setup(open(), config);
        seed(&store, &["a"]).await;

        let _held = locks.acquire(&pid()).await.unwrap();
        let err = service.assign_editions(&pid()).await.unwrap_err();

        assert!(matches!(
            err,
            AssignmentError::LockTimeout { waited_ms: 20, .. }
        ));
        assert_eq!(number_of(&store, "a"), None);
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let Fixture { service, store, .. } = setup(open(), EditionConfig::default());
        seed(&store, &["a", "b"]).await;

        let plan = service.preview_assignment(&pid()).await.unwrap();

        assert_eq!(plan.assigned_count(), 2);
        assert_eq!(number_of(&store, "a"), None);
    }

    #[tokio::test]
    async fn test_claim_then_deactivate_older_keeps_claimed_number() {
        let Fixture { service, store, .. } = setup(limited(10), EditionConfig::default());
        seed(&store, &["a", "b", "c"]).await;
        service.assign_editions(&pid()).await.unwrap();

        service.claim(&LineItemId::new("c"), at(100)).await.unwrap();
        service.deactivate(&LineItemId::new("a")).await.unwrap();

        // b moves down to 1, c stays frozen at 3
        assert_eq!(number_of(&store, "a"), None);
        assert_eq!(number_of(&store, "b"), Some(1));
        assert_eq!(number_of(&store, "c"), Some(3));
    }

    #[tokio::test]
    async fn test_claim_errors() {
        let Fixture { service, store, .. } = setup(open(), EditionConfig::default());
        seed(&store, &["a", "b"]).await;

        let err = service.claim(&LineItemId::new("a"), at(5)).await.unwrap_err();
        assert!(matches!(err, AssignmentError::NotAssigned(_)));

        service.assign_editions(&pid()).await.unwrap();
        service.claim(&LineItemId::new("a"), at(5)).await.unwrap();
        let err = service.claim(&LineItemId::new("a"), at(6)).await.unwrap_err();
        assert!(matches!(err, AssignmentError::AlreadyClaimed(_)));

        service.deactivate(&LineItemId::new("b")).await.unwrap();
        let err = service.claim(&LineItemId::new("b"), at(7)).await.unwrap_err();
        assert!(matches!(err, AssignmentError::InactiveLineItem(_)));

        let err = service
            .claim(&LineItemId::new("missing"), at(8))
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::LineItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_record_purchase_numbers_new_item() {
        let Fixture { service, store, .. } = setup(limited(3), EditionConfig::default());
        seed(&store, &["a"]).await;

        let report = service
            .record_purchase(LineItem::new(LineItemId::new("b"), pid(), at(50)))
            .await
            .unwrap();

        assert_eq!(report.assigned, 2);
        assert_eq!(number_of(&store, "b"), Some(2));
    }

    #[tokio::test]
    async fn test_record_purchase_rejects_preclaimed_item() {
        let Fixture { service, store, .. } = setup(limited(3), EditionConfig::default());
        service
            .record_purchase(LineItem::new(LineItemId::new("a"), pid(), at(0)))
            .await
            .unwrap();
        service.claim(&LineItemId::new("a"), at(10)).await.unwrap();

        let forged = LineItem::new(LineItemId::new("b"), pid(), at(20))
            .with_edition(1, Some(3))
            .with_claim(at(21));
        let err = service.record_purchase(forged).await.unwrap_err();

        assert!(matches!(err, AssignmentError::AlreadyClaimed(_)));
        assert!(store
            .get_line_item(&LineItemId::new("b"))
            .await
            .unwrap()
            .is_none());
        assert!(service.verify_editions(&pid()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_record_purchase_discards_supplied_number() {
        let Fixture { service, store, .. } = setup(limited(3), EditionConfig::default());
        seed(&store, &["a"]).await;
        service.assign_editions(&pid()).await.unwrap();
        service.claim(&LineItemId::new("a"), at(10)).await.unwrap();

        let report = service
            .record_purchase(
                LineItem::new(LineItemId::new("b"), pid(), at(20)).with_edition(1, Some(3)),
            )
            .await
            .unwrap();

        assert_eq!(report.assigned, 1);
        assert_eq!(number_of(&store, "a"), Some(1));
        assert_eq!(number_of(&store, "b"), Some(2));
        assert!(service.verify_editions(&pid()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_record_purchase_rejects_inactive_item() {
        let Fixture { service, store, .. } = setup(open(), EditionConfig::default());

        let err = service
            .record_purchase(
                LineItem::new(LineItemId::new("x"), pid(), at(0))
                    .with_status(LineItemStatus::Inactive),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AssignmentError::InactiveLineItem(_)));
        assert!(store.snapshot().line_item(&LineItemId::new("x")).is_none());
    }

    #[tokio::test]
    async fn test_run_duration_is_observed() {
        let Fixture { service, store, .. } = setup(open(), EditionConfig::default());
        seed(&store, &["a"]).await;
        let before = ASSIGNMENT_DURATION.get_sample_count();

        service.assign_editions(&pid()).await.unwrap();

        assert!(ASSIGNMENT_DURATION.get_sample_count() > before);
    }

    #[tokio::test]
    async fn test_verify_reports_clean_after_assignment() {
        let Fixture { service, store, .. } = setup(limited(4), EditionConfig::default());
        seed(&store, &["a", "b"]).await;

        assert!(!service.verify_editions(&pid()).await.unwrap().is_clean());
        service.assign_editions(&pid()).await.unwrap();
        assert!(service.verify_editions(&pid()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_assign_all_continues_past_failures() {
        let Fixture { service, store, .. } = setup(limited(1), EditionConfig::default());
        seed(&store, &["a", "b"]).await;
        let other = ProductId::new("print-2");
        store
            .insert_line_item(LineItem::new(LineItemId::new("z"), other.clone(), at(0)))
            .await
            .unwrap();

        let results = service.assign_all().await.unwrap();

        assert_eq!(results.len(), 2);
        let (_, first) = results.iter().find(|(p, _)| p == &pid()).unwrap();
        assert!(first.as_ref().unwrap_err().is_capacity_exceeded());
        let (_, second) = results.iter().find(|(p, _)| p == &other).unwrap();
        assert_eq!(second.as_ref().unwrap().assigned, 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_serialise() {
        let Fixture { service, store, .. } = setup(open(), EditionConfig::default());
        seed(&store, &["a", "b", "c", "d"]).await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.assign_editions(&pid()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(service.verify_editions(&pid()).await.unwrap().is_clean());
    }
}
