//! Spill manager for external-memory operators.
//!
//! Tracks the segments each operator creates, and hands out streaming
//! writers/readers over them. Segment bytes live in a `Storage` backend.

pub mod codec;
pub mod encoding;
pub mod segment;
pub mod stream;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use spillway_core::id::SpillId;

use crate::error::{Error, Result};

pub use codec::Codec;
pub use segment::{SegmentHeader, SegmentName, SegmentStats, FRAME_HEADER_LEN, HEADER_LEN};
pub use stream::{SegmentReader, SegmentWriter};

/// Abstract storage interface for spill segments.
///
/// Implemented by `spillway-io::FsStorage` for the local filesystem and by
/// `spillway-io::MemoryStorage` for tests.
pub trait Storage: Send + Sync {
    /// Create or replace a path with `bytes`. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Append bytes to an existing path.
    fn append(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a byte range from a path. Returns exactly `len` bytes or error.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}

/// Central registry of live spill segments.
///
/// Shared behind an `Arc` by every operator of a session; the registry is
/// internally synchronized so operators only need `&self`.
pub struct SpillManager {
    storage: Arc<dyn Storage>,
    codec: Codec,
    root_dir: String,
    segments: Mutex<HashMap<SegmentName, String>>,
}

impl SpillManager {
    pub fn new(storage: Arc<dyn Storage>, codec: Codec, root_dir: impl Into<String>) -> Self {
        Self {
            storage,
            codec,
            root_dir: root_dir.into(),
            segments: Mutex::new(HashMap::new()),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Create an empty segment and return a writer that emits frames of
    /// `page_capacity` tuples.
    pub fn create_segment(&self, name: SegmentName, page_capacity: usize) -> Result<SegmentWriter> {
        let path = format!("{}/{}.seg", self.root_dir, name);
        let writer =
            SegmentWriter::create(
                Arc::clone(&self.storage),
                path.clone(),
                self.codec,
                page_capacity,
            )?;
        tracing::debug!(segment = %name, path = %path, "segment created");
        self.registry().insert(name, path);
        Ok(writer)
    }

    /// Open a fresh sequential reader positioned at the first frame.
    pub fn open_segment(&self, name: &SegmentName) -> Result<SegmentReader> {
        let path = self.path_of(name)?;
        SegmentReader::open(Arc::clone(&self.storage), path)
    }

    pub fn path_of(&self, name: &SegmentName) -> Result<String> {
        self.registry()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("unknown segment {name}")))
    }

    /// Delete a segment. Unknown names are a no-op.
    pub fn delete_segment(&self, name: &SegmentName) -> Result<()> {
        let path = self.registry().remove(name);
        if let Some(path) = path {
            self.storage.delete(&path)?;
            tracing::debug!(segment = %name, "segment deleted");
        }
        Ok(())
    }

    pub fn list_segments(&self) -> Vec<SegmentName> {
        let mut names: Vec<SegmentName> = self.registry().keys().copied().collect();
        names.sort_by_key(|n| (n.spill, n.pass, n.run));
        names
    }

    /// Live segments owned by one spill id.
    pub fn segments_for(&self, spill: SpillId) -> Vec<SegmentName> {
        self.list_segments()
            .into_iter()
            .filter(|n| n.spill == spill)
            .collect()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SegmentName, String>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.segments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
