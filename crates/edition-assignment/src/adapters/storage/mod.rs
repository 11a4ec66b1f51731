//! # Storage Adapters
//!
//! - `memory`: In-memory tables for services and tests
//! - `file`: JSON-file tables for the admin tool

mod file;
mod memory;
mod tables;

pub use file::FileBackedEditionStore;
pub use memory::InMemoryEditionStore;
pub use tables::EditionTables;
