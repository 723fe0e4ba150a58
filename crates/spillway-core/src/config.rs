//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bytes per page. Page capacity of every operator is derived from this.
    pub page_size_bytes: usize,

    /// Default number of buffer frames handed to sort and join operators.
    pub buffer_frames: usize,

    /// Directory for spill files (local-path configuration).
    pub spill_dir: String,

    /// Optional fully-qualified spill URI (`file:///tmp/x` or `memory://`).
    pub spill_uri: Option<String>,

    /// Frame codec for spill segments: "none", "zstd" or "lz4".
    pub codec: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size_bytes: 4096,
            buffer_frames: 8,
            spill_dir: "/tmp/spillway-spill".to_string(),
            spill_uri: None,
            codec: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uri: Option<String>,
    pub root: String,
}

impl StorageConfig {
    pub fn scheme(&self) -> Option<&str> {
        self.uri.as_deref().and_then(uri_scheme)
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPILLWAY_PAGE_SIZE`: page size in bytes
    /// - `SPILLWAY_BUFFER_FRAMES`: default frame budget per operator
    /// - `SPILLWAY_SPILL_DIR`: spill directory
    /// - `SPILLWAY_SPILL_URI`: spill URI
    /// - `SPILLWAY_CODEC`: spill frame codec
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SPILLWAY_PAGE_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.page_size_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("SPILLWAY_BUFFER_FRAMES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.buffer_frames = v;
            }
        }

        if let Ok(s) = std::env::var("SPILLWAY_SPILL_DIR") {
            cfg.spill_dir = s;
        }

        if let Ok(s) = std::env::var("SPILLWAY_SPILL_URI") {
            cfg.spill_uri = Some(s);
        }

        if let Ok(s) = std::env::var("SPILLWAY_CODEC") {
            cfg.codec = s;
        }

        cfg
    }

    /// Reject values no operator could run with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size_bytes == 0 {
            return Err(Error::Config("page_size_bytes must be positive".into()));
        }
        if self.buffer_frames < 2 {
            return Err(Error::Config(format!(
                "buffer_frames must be at least 2, got {}",
                self.buffer_frames
            )));
        }
        Ok(())
    }

    /// Produce a storage configuration snapshot used by the IO layer.
    pub fn storage_config(&self) -> StorageConfig {
        let scheme = self.spill_uri.as_deref().and_then(uri_scheme);

        let root = match (scheme, self.spill_uri.as_ref()) {
            (Some("file"), Some(uri)) => {
                file_uri_to_path(uri).unwrap_or_else(|| self.spill_dir.clone())
            }
            (Some(_), Some(uri)) => uri.trim_end_matches('/').to_string(),
            _ => self.spill_dir.clone(),
        };

        StorageConfig {
            uri: self.spill_uri.clone(),
            root,
        }
    }
}

fn uri_scheme(uri: &str) -> Option<&str> {
    uri.split_once("://")
        .map(|(scheme, _)| scheme.trim())
        .filter(|s| !s.is_empty())
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}
