#![forbid(unsafe_code)]
//! spillway-io: backing storage for spill segments.
//!
//! Implements `spillway_mem::Storage` for the local filesystem and for an
//! in-process map, and picks one from a `StorageConfig`.

pub mod error;
pub mod memory_storage;
pub mod storage;

pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use storage::{build_storage_from_config, FsStorage};
