//! Storage adapters implementing `spillway_mem::spill::Storage`.
//!
//! - `fs`: local filesystem (default).
//! - `memory`: in-process map, selected with `memory://`.
//!
//! `build_storage_from_config` chooses one from the configured spill URI
//! (e.g. `file:///tmp/spill`, `memory://`).

mod fs;
pub use fs::FsStorage;

use std::sync::Arc;

use spillway_core::config::StorageConfig;
use spillway_mem::Storage;

use crate::error::{Error, Result};
use crate::memory_storage::MemoryStorage;

/// Build the storage backend for `cfg`.
pub fn build_storage_from_config(cfg: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let backend: Arc<dyn Storage> = match cfg.scheme() {
        Some("file") | None => Arc::new(FsStorage::new()),
        Some("memory") => Arc::new(MemoryStorage::new()),
        Some(other) => return Err(Error::Config(format!("unsupported spill scheme '{other}'"))),
    };
    tracing::debug!(
        scheme = cfg.scheme().unwrap_or("file"),
        root = %cfg.root,
        "spill storage selected"
    );
    Ok(backend)
}
