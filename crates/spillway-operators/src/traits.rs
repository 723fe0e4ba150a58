//! Operator trait + the context every operator is built with.
//!
//! Operators form a tree of single-owner boxes. The consumer drives it by
//! pulling: `open()` once, `next()` until it yields `None`, then `close()`.

use std::sync::Arc;

use spillway_core::id::SpillIdGen;
use spillway_core::prelude::{AggregateKind, Schema, Value};
use spillway_core::tuple::{Batch, Tuple};
use spillway_mem::SpillManager;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("{kind} is not defined for value {value}")]
    AggregateType { kind: AggregateKind, value: Value },

    #[error("spill error: {0}")]
    Spill(#[from] spillway_mem::Error),

    #[error("core error: {0}")]
    Core(spillway_core::Error),
}

impl From<spillway_core::Error> for OpError {
    fn from(e: spillway_core::Error) -> Self {
        match e {
            spillway_core::Error::Config(msg) => OpError::Config(msg),
            spillway_core::Error::Schema(msg) => OpError::Schema(msg),
            other => OpError::Core(other),
        }
    }
}

/// Shared handles an operator needs to spill. Cheap to clone.
#[derive(Clone)]
pub struct ExecContext {
    pub spill: Arc<SpillManager>,
    pub ids: Arc<SpillIdGen>,
    /// Bytes per page; every operator derives its batch capacity from this.
    pub page_size: usize,
}

impl ExecContext {
    pub fn new(spill: Arc<SpillManager>, ids: Arc<SpillIdGen>, page_size: usize) -> Self {
        Self {
            spill,
            ids,
            page_size,
        }
    }

    /// Tuples per page for `schema`.
    pub fn capacity_for(&self, schema: &Schema) -> Result<usize, OpError> {
        Ok(Batch::capacity_for(self.page_size, schema.tuple_size())?)
    }
}

/// Trait that all operators implement.
///
/// Invariants:
/// - `next()` never returns an empty batch; `Ok(None)` is end-of-stream and
///   keeps being returned on later calls.
/// - By the time `next()` returns `Ok(None)` the operator has released its
///   frames and deleted its spill segments.
/// - `close()` is infallible and idempotent. It also cleans up after a
///   failed or partial `open()`.
pub trait Operator: Send {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Output layout. Available before `open()`.
    fn schema(&self) -> &Schema;

    fn open(&mut self) -> Result<(), OpError>;

    fn next(&mut self) -> Result<Option<Batch>, OpError>;

    fn close(&mut self);
}

/// Drain an operator into a vector of tuples, closing it afterwards even on error.
pub fn collect_all(op: &mut dyn Operator) -> Result<Vec<Tuple>, OpError> {
    let result = (|| -> Result<Vec<Tuple>, OpError> {
        op.open()?;
        let mut out = Vec::new();
        while let Some(batch) = op.next()? {
            out.extend(batch.into_tuples());
        }
        Ok(out)
    })();
    op.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_onto_operator_errors() {
        let config: OpError = spillway_core::Error::Config("bad page".into()).into();
        assert!(matches!(config, OpError::Config(ref m) if m == "bad page"));

        let schema: OpError = spillway_core::Error::Schema("no column".into()).into();
        assert!(matches!(schema, OpError::Schema(_)));

        let other: OpError = spillway_core::Error::Invariant("lost run".into()).into();
        assert!(matches!(other, OpError::Core(spillway_core::Error::Invariant(_))));
    }

    #[test]
    fn question_mark_lifts_core_results() {
        fn lift(r: spillway_core::Result<()>) -> Result<(), OpError> {
            r?;
            Ok(())
        }
        assert!(lift(Ok(())).is_ok());
        assert!(matches!(
            lift(Err(spillway_core::Error::Config("x".into()))),
            Err(OpError::Config(_))
        ));
    }
}
