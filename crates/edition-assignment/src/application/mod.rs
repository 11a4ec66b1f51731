//! Application Layer
//!
//! Orchestrates locking, loading, planning and writing.

pub mod service;

pub use service::EditionAssignmentService;
