//! Ports module for Edition Assignment
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::{EditionAssignmentApi, LineItemLifecycleApi};
pub use outbound::{LineItemStore, ProductCatalog, ProductLockManager};
