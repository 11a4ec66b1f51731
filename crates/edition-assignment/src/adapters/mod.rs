//! Adapters implementing the outbound ports.

pub mod lock;
pub mod storage;

pub use lock::{DataDirLock, InMemoryProductLocks};
pub use storage::{EditionTables, FileBackedEditionStore, InMemoryEditionStore};
