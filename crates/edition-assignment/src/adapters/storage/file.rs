use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::tables::EditionTables;
use crate::adapters::lock::DataDirLock;
use crate::domain::entities::{EditionWrite, LineItem, Product};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{LineItemId, ProductId};
use crate::ports::outbound::{LineItemStore, ProductCatalog};

/// File-backed products and line items store.
///
/// Persists both tables as one JSON document in the data directory. Every
/// mutation is applied to a copy, written to a temp file, fsynced and renamed
/// into place before the in-memory tables are swapped, so a failed write
/// leaves both disk and memory as they were. The data directory stays locked
/// for the lifetime of the store.
pub struct FileBackedEditionStore {
    tables: RwLock<EditionTables>,
    path: PathBuf,
    _lock: DataDirLock,
}

impl FileBackedEditionStore {
    const DATA_FILE: &'static str = "editions.json";

    /// Open (or create) the store in `data_dir`.
    ///
    /// Waits up to `lock_timeout` for other processes to release the directory.
    pub fn open(data_dir: &Path, lock_timeout: Duration) -> Result<Self, StoreError> {
        let lock = DataDirLock::acquire(data_dir, lock_timeout)?;
        let path = data_dir.join(Self::DATA_FILE);

        let tables = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let tables: EditionTables = serde_json::from_slice(&bytes)?;
            info!(
                "[editions] 💾 Loaded {} products and {} line items from {}",
                tables.products.len(),
                tables.line_items.len(),
                path.display()
            );
            tables
        } else {
            info!("[editions] 📁 No existing data file at {}", path.display());
            EditionTables::new()
        };

        Ok(Self {
            tables: RwLock::new(tables),
            path,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> EditionTables {
        self.tables.read().clone()
    }

    pub fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        self.mutate(|tables| {
            tables.upsert_product(product);
            Ok(())
        })
    }

    /// Apply `f` to a copy, persist it, then publish it.
    fn mutate<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut EditionTables) -> Result<(), StoreError>,
    {
        let mut guard = self.tables.write();
        let mut next = guard.clone();
        f(&mut next)?;
        self.save(&next)?;
        *guard = next;
        Ok(())
    }

    fn save(&self, tables: &EditionTables) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(tables)?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for FileBackedEditionStore {
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().product(product_id).cloned())
    }
}

#[async_trait]
impl LineItemStore for FileBackedEditionStore {
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
        self.mutate(|tables| tables.insert_line_item(item))
    }

    async fn update_line_item(&self, item: LineItem) -> Result<(), StoreError> {
        self.mutate(|tables| tables.update_line_item(item))
    }

    async fn apply_edition_writes(
        &self,
        product_id: &ProductId,
        writes: &[EditionWrite],
    ) -> Result<(), StoreError> {
        self.mutate(|tables| tables.apply_edition_writes(product_id, writes))
    }

    async fn product_ids_with_active_items(&self) -> Result<Vec<ProductId>, StoreError> {
        Ok(self.tables.read().product_ids_with_active_items())
    }
}
