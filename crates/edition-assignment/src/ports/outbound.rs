//! Outbound Ports (Driven Ports / SPI)

use crate::domain::entities::{EditionWrite, LineItem, Product};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{LineItemId, ProductId};
use async_trait::async_trait;

/// Read-only source of product edition configuration.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up a product; `None` when no record matches.
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError>;
}

/// Line item persistence.
///
/// Implementations must apply `apply_edition_writes` atomically: either every
/// write lands or none does.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// All line items of a product, active and inactive, in any order.
    async fn line_items_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<LineItem>, StoreError>;

    async fn get_line_item(&self, id: &LineItemId) -> Result<Option<LineItem>, StoreError>;

    /// Insert a new item. Fails with `Conflict` if the id exists.
    async fn insert_line_item(&self, item: LineItem) -> Result<(), StoreError>;

    /// Replace an existing item. Fails with `NotFound` if absent.
    async fn update_line_item(&self, item: LineItem) -> Result<(), StoreError>;

    /// Set edition number and total on the given items of one product.
    ///
    /// Every write must target an existing item of `product_id`.
    async fn apply_edition_writes(
        &self,
        product_id: &ProductId,
        writes: &[EditionWrite],
    ) -> Result<(), StoreError>;

    /// Products that currently have at least one active item.
    async fn product_ids_with_active_items(&self) -> Result<Vec<ProductId>, StoreError>;
}

/// Advisory lock keyed by product identifier.
///
/// Serialises concurrent assignment runs on the same product. Dropping the
/// guard releases the lock.
#[async_trait]
pub trait ProductLockManager: Send + Sync {
    type Guard: Send;

    /// Wait for and take the lock for `product_id`.
    async fn acquire(&self, product_id: &ProductId) -> Result<Self::Guard, StoreError>;
}
