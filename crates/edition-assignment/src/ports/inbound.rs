//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::{AssignmentPlan, AssignmentReport, IntegrityReport, LineItem};
use crate::domain::errors::AssignmentResult;
use crate::domain::value_objects::{LineItemId, ProductId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Primary Edition Assignment API
#[async_trait]
pub trait EditionAssignmentApi: Send + Sync {
    /// (Re)number every active line item of a product.
    ///
    /// This is the main entry point. It:
    /// 1. Locks the product
    /// 2. Reads the product configuration and its line items
    /// 3. Plans the numbering (all-or-nothing)
    /// 4. Applies the writes atomically
    ///
    /// Fails with `CapacityExceeded` when a limited edition is oversold; in
    /// that case nothing is written.
    async fn assign_editions(&self, product_id: &ProductId) -> AssignmentResult<AssignmentReport>;

    /// Compute the numbering an assignment would produce, without writing.
    async fn preview_assignment(&self, product_id: &ProductId) -> AssignmentResult<AssignmentPlan>;

    /// Audit the stored numbering against the domain invariants.
    async fn verify_editions(&self, product_id: &ProductId) -> AssignmentResult<IntegrityReport>;

    /// Assign several products, continuing past individual failures.
    async fn assign_many(
        &self,
        product_ids: &[ProductId],
    ) -> Vec<(ProductId, AssignmentResult<AssignmentReport>)>;
}

/// Upstream events that change a product's active set.
///
/// Each mutating call re-runs assignment for the affected product.
#[async_trait]
pub trait LineItemLifecycleApi: Send + Sync {
    /// Record a new purchase and number it.
    async fn record_purchase(&self, item: LineItem) -> AssignmentResult<AssignmentReport>;

    /// Cancellation, refund or restock: free the item's number.
    async fn deactivate(&self, line_item_id: &LineItemId) -> AssignmentResult<AssignmentReport>;

    /// NFC authentication: freeze the item's current number.
    async fn claim(
        &self,
        line_item_id: &LineItemId,
        claimed_at: DateTime<Utc>,
    ) -> AssignmentResult<LineItem>;
}
