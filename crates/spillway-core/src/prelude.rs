//! Convenient re-exports for downstream crates.

pub use crate::budget::{FrameBudget, FrameGuard};
pub use crate::config::{EngineConfig, StorageConfig};
pub use crate::error::{Error, Result};
pub use crate::id::{SpillId, SpillIdGen};
pub use crate::schema::{AggregateKind, Attribute, DataType, Schema};
pub use crate::tuple::{Batch, Tuple};
pub use crate::types::Value;
