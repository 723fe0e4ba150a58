//! In-memory storage backend.
//!
//! A map from path to bytes behind a mutex. Selected by the `memory://` spill
//! URI; integration tests use it to inspect what operators leave behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use spillway_mem::error::{Error as MemError, Result as MemResult};
use spillway_mem::Storage;

/// Thread-safe in-memory storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.map().contains_key(path)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Cut an object down to `len` bytes. Used to simulate torn writes.
    pub fn truncate(&self, path: &str, len: usize) -> MemResult<()> {
        let mut data = self.map();
        let bytes = data
            .get_mut(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))?;
        bytes.truncate(len);
        Ok(())
    }

    /// Flip the bits of one byte in place.
    pub fn corrupt(&self, path: &str, offset: usize) -> MemResult<()> {
        let mut data = self.map();
        let byte = data
            .get_mut(path)
            .and_then(|bytes| bytes.get_mut(offset))
            .ok_or_else(|| MemError::Storage(format!("no byte {offset} in {path}")))?;
        *byte ^= 0xff;
        Ok(())
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        self.map().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn append(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        let mut data = self.map();
        let existing = data
            .get_mut(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))?;
        existing.extend_from_slice(bytes);
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> MemResult<Vec<u8>> {
        let data = self.map();
        let bytes = data
            .get(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))?;

        let start = offset as usize;
        let end = start.saturating_add(len);
        if end > bytes.len() {
            return Err(MemError::Storage(format!(
                "range {start}..{end} exceeds size {} of {path}",
                bytes.len()
            )));
        }
        Ok(bytes[start..end].to_vec())
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        self.map().remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let mut result: Vec<String> = self
            .map()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        self.map()
            .get(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))
    }
}
