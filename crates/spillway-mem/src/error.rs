use thiserror::Error;

/// Result type local to spillway-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("frame budget exceeded for '{tag}': requested {requested}, used {used}/{capacity}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("spill storage error: {0}")]
    Storage(String),

    #[error("unsupported codec: {0}")]
    CodecUnsupported(&'static str),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch in segment '{0}'")]
    ChecksumMismatch(String),

    #[error("segment '{path}' truncated at byte {offset}: wanted {expected} bytes, got {found}")]
    Truncated {
        path: String,
        offset: u64,
        expected: usize,
        found: usize,
    },

    #[error("tuple encoding error: {0}")]
    Encoding(String),
}
