//! # Edition Assignment
//!
//! Assigns contiguous edition numbers to the active line items of a product
//! while never renumbering items a collector has already authenticated via NFC.
//!
//! ## Architecture
//!
//! - **Domain**: Core entities (Product, LineItem, AssignmentPlan) and invariants
//! - **Algorithms**: Candidate sequencing and the assignment planner
//! - **Ports**: Inbound (EditionAssignmentApi, LineItemLifecycleApi) and
//!   Outbound (ProductCatalog, LineItemStore, ProductLockManager)
//! - **Adapters**: In-memory and file-backed stores, product and data-dir locks
//! - **Application**: Service orchestration under a per-product lock
//! - **IPC**: Request handler for the single-parameter assignment call
//!
//! ## Guarantees
//!
//! - Active edition numbers are unique per product.
//! - Claimed, numbered items keep their number forever.
//! - Limited editions never exceed their size; overflow fails the whole call.
//! - Unclaimed items are renumbered oldest-first on every run to close gaps.

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;

pub use adapters::{
    DataDirLock, FileBackedEditionStore, InMemoryEditionStore, InMemoryProductLocks,
};
pub use application::service::EditionAssignmentService;
pub use config::EditionConfig;
pub use domain::entities::*;
pub use domain::errors::{AssignmentError, AssignmentResult, StoreError};
pub use domain::value_objects::*;
pub use ipc::{
    AssignEditionsRequest, AssignEditionsResponse, CallerKind, EditionAssignmentHandler,
    ErrorCode,
};
pub use ports::inbound::{EditionAssignmentApi, LineItemLifecycleApi};
pub use ports::outbound::{LineItemStore, ProductCatalog, ProductLockManager};
