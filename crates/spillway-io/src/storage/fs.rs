use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use spillway_mem::error::{Error as MemError, Result as MemResult};
use spillway_mem::Storage;

/// Local filesystem storage. Paths are absolute or relative to the process cwd.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| MemError::Storage(format!("mkparent: {e}")))?;
        }
        let mut f = File::create(p).map_err(|e| MemError::Storage(format!("create {path}: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| MemError::Storage(format!("write {path}: {e}")))?;
        f.flush()
            .map_err(|e| MemError::Storage(format!("flush {path}: {e}")))?;
        Ok(())
    }

    fn append(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(Path::new(path))
            .map_err(|e| MemError::Storage(format!("open for append {path}: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| MemError::Storage(format!("append {path}: {e}")))?;
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> MemResult<Vec<u8>> {
        let mut f =
            File::open(Path::new(path))
                .map_err(|e| MemError::Storage(format!("open {path}: {e}")))?;
        f.seek(SeekFrom::Start(offset))
            .map_err(|e| MemError::Storage(format!("seek {path}: {e}")))?;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf).map_err(|e| {
            MemError::Storage(format!("read {len} bytes at {offset} from {path}: {e}"))
        })?;
        Ok(buf)
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        match fs::remove_file(Path::new(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemError::Storage(format!("delete {path}: {e}"))),
        }
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let prefix_path = Path::new(prefix);
        let mut results = Vec::new();

        if !prefix_path.exists() {
            return Ok(results);
        }

        if prefix_path.is_file() {
            if let Some(s) = prefix_path.to_str() {
                results.push(s.to_string());
            }
            return Ok(results);
        }

        fn visit_dirs(dir: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit_dirs(&path, results)?;
                } else if let Some(s) = path.to_str() {
                    results.push(s.to_string());
                }
            }
            Ok(())
        }

        visit_dirs(prefix_path, &mut results)
            .map_err(|e| MemError::Storage(format!("list {prefix}: {e}")))?;
        results.sort();
        Ok(results)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        let meta =
            fs::metadata(Path::new(path))
                .map_err(|e| MemError::Storage(format!("size {path}: {e}")))?;
        Ok(meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("spillway-fs-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn write_append_read() {
        let dir = scratch_dir("rw");
        let path = dir.join("nested/seg.bin");
        let path = path.to_str().unwrap();
        let s = FsStorage::new();

        s.write(path, b"head").unwrap();
        s.append(path, b"-tail").unwrap();
        assert_eq!(s.size(path).unwrap(), 9);
        assert_eq!(s.read_range(path, 5, 4).unwrap(), b"tail");
        assert!(s.read_range(path, 6, 10).is_err());

        assert_eq!(s.list(dir.to_str().unwrap()).unwrap(), vec![path.to_string()]);
        s.delete(path).unwrap();
        s.delete(path).unwrap();
        assert!(s.size(path).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_requires_existing_file() {
        let dir = scratch_dir("append");
        let path = dir.join("missing.bin");
        assert!(FsStorage::new().append(path.to_str().unwrap(), b"x").is_err());
    }
}
