//! In-process advisory locks keyed by product identifier.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::errors::StoreError;
use crate::domain::value_objects::ProductId;
use crate::ports::outbound::ProductLockManager;

/// Lazily creates one async mutex per product and hands out owned guards.
///
/// Same product → same lock; different products never contend.
#[derive(Default)]
pub struct InMemoryProductLocks {
    locks: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
}

impl InMemoryProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, product_id: &ProductId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(product_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Number of products that have ever been locked.
    pub fn tracked_products(&self) -> usize {
        self.locks.lock().len()
    }
}

#[async_trait]
impl ProductLockManager for InMemoryProductLocks {
    type Guard = OwnedMutexGuard<()>;

    async fn acquire(&self, product_id: &ProductId) -> Result<Self::Guard, StoreError> {
        Ok(self.lock_for(product_id).lock_owned().await)
    }
}
