//! # Locking
//!
//! ## Modules
//!
//! - `flock`: Process-level data directory lock using fs2
//! - `product`: Per-product advisory locks serialising assignment runs

mod flock;
mod product;

pub use flock::{is_process_running, DataDirLock, DEFAULT_LOCK_TIMEOUT};
pub use product::InMemoryProductLocks;
