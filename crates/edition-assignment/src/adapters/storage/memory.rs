use async_trait::async_trait;
use parking_lot::RwLock;

use super::tables::EditionTables;
use crate::domain::entities::{EditionWrite, LineItem, Product};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{LineItemId, ProductId};
use crate::ports::outbound::{LineItemStore, ProductCatalog};

/// In-memory products and line items store.
///
/// Batch writes run under a single write lock, so readers never observe a
/// partially applied assignment.
#[derive(Default)]
pub struct InMemoryEditionStore {
    tables: RwLock<EditionTables>,
}

impl InMemoryEditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: EditionTables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn upsert_product(&self, product: Product) {
        self.tables.write().upsert_product(product);
    }

    /// Copy of the current tables.
    pub fn snapshot(&self) -> EditionTables {
        self.tables.read().clone()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryEditionStore {
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().product(product_id).cloned())
    }
}

#[async_trait]
impl LineItemStore for InMemoryEditionStore {
    async fn line_items_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<LineItem>, StoreError> {
        Ok(self.tables.read().items_for_product(product_id))
    }

    async fn get_line_item(&self, id: &LineItemId) -> Result<Option<LineItem>, StoreError> {
        Ok(self.tables.read().line_item(id).cloned())
    }

    async fn insert_line_item(&self, item: LineItem) -> Result<(), StoreError> {
        self.tables.write().insert_line_item(item)
    }

    async fn update_line_item(&self, item: LineItem) -> Result<(), StoreError> {
        self.tables.write().update_line_item(item)
    }

    async fn apply_edition_writes(
        &self,
        product_id: &ProductId,
        writes: &[EditionWrite],
    ) -> Result<(), StoreError> {
        self.tables.write().apply_edition_writes(product_id, writes)
    }

    async fn product_ids_with_active_items(&self) -> Result<Vec<ProductId>, StoreError> {
        Ok(self.tables.read().product_ids_with_active_items())
    }
}
