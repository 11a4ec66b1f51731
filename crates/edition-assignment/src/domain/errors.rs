//! Error types for Edition Assignment

use super::value_objects::{LineItemId, ProductId};
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// All errors that can occur while assigning edition numbers
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The active set does not fit in a limited edition (oversell)
    #[error(
        "Edition capacity exceeded for product {product_id}: candidate {candidate} > edition size {edition_size}"
    )]
    CapacityExceeded {
        product_id: ProductId,
        candidate: u32,
        edition_size: u32,
    },

    /// No product record (strict lookup only)
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Malformed product identifier
    #[error("Invalid product id: {0}")]
    InvalidProductId(String),

    #[error("Line item not found: {0}")]
    LineItemNotFound(LineItemId),

    /// Claim attempted before an edition number exists
    #[error("Line item {0} has no edition number to claim")]
    NotAssigned(LineItemId),

    #[error("Line item {0} is already claimed")]
    AlreadyClaimed(LineItemId),

    #[error("Line item {0} is inactive")]
    InactiveLineItem(LineItemId),

    /// Active set exceeds configured limit
    #[error("Too many line items: {count} > {max}")]
    TooManyLineItems { count: usize, max: usize },

    /// Product lock not acquired in time
    #[error("Timed out after {waited_ms}ms waiting for edition lock on product {product_id}")]
    LockTimeout { product_id: ProductId, waited_ms: u64 },

    /// Storage failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AssignmentError {
    /// True for the oversell alarm; callers must not retry blindly.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, AssignmentError::CapacityExceeded { .. })
    }
}

/// Storage-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// Data directory held by another process
    #[error("Data directory already in use{} ({})", pid.map(|p| format!(" by process {}", p)).unwrap_or_default(), path.display())]
    Locked { pid: Option<u32>, path: PathBuf },

    /// Write rejected because it would violate store consistency
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
