#![forbid(unsafe_code)]
//! spillway-exec: the engine that turns an `EngineConfig` into a spill
//! session and runs operator trees built from `PlanNode`s.

pub mod metrics;
pub mod runtime;

pub use metrics::QueryStats;
pub use runtime::{Engine, ExecError};
