//! Products and line items tables shared by the store adapters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::{EditionWrite, LineItem, Product};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{LineItemId, ProductId};

/// Row storage for both tables.
///
/// Every mutating method validates fully before touching a row, so a failed
/// call leaves the tables unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionTables {
    #[serde(default)]
    pub products: BTreeMap<ProductId, Product>,
    #[serde(default)]
    pub line_items: BTreeMap<LineItemId, LineItem>,
}

impl EditionTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn product(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.get(id)
    }

    pub fn items_for_product(&self, product_id: &ProductId) -> Vec<LineItem> {
        self.line_items
            .values()
            .filter(|item| &item.product_id == product_id)
            .cloned()
            .collect()
    }

    pub fn insert_line_item(&mut self, item: LineItem) -> Result<(), StoreError> {
        if self.line_items.contains_key(&item.id) {
            return Err(StoreError::Conflict(format!(
                "line item {} already exists",
                item.id
            )));
        }
        self.line_items.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn update_line_item(&mut self, item: LineItem) -> Result<(), StoreError> {
        match self.line_items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("line item {}", item.id))),
        }
    }

    /// Apply all writes or none.
    pub fn apply_edition_writes(
        &mut self,
        product_id: &ProductId,
        writes: &[EditionWrite],
    ) -> Result<(), StoreError> {
        for write in writes {
            match self.line_items.get(&write.line_item_id) {
                Some(item) if &item.product_id == product_id => {}
                Some(item) => {
                    return Err(StoreError::Conflict(format!(
                        "line item {} belongs to product {}, not {}",
                        item.id, item.product_id, product_id
                    )))
                }
                None => {
                    return Err(StoreError::NotFound(format!(
                        "line item {}",
                        write.line_item_id
                    )))
                }
            }
        }

        for write in writes {
            if let Some(item) = self.line_items.get_mut(&write.line_item_id) {
                item.edition_number = Some(write.edition_number);
                item.edition_total = write.edition_total;
            }
        }
        Ok(())
    }

    pub fn product_ids_with_active_items(&self) -> Vec<ProductId> {
        let ids: BTreeSet<&ProductId> = self
            .line_items
            .values()
            .filter(|item| item.is_active())
            .map(|item| &item.product_id)
            .collect();
        ids.into_iter().cloned().collect()
    }
}
