//! IPC Module for Edition Assignment
//!
//! The remote entry point: one call per product, identified by its id alone.
//! Callers are the order sync job, the admin console and the checkout hook.

pub mod handler;
pub mod payloads;

pub use handler::EditionAssignmentHandler;
pub use payloads::*;
