#![forbid(unsafe_code)]
//! spillway-operators: pull-based physical operators.
//!
//! Design intent:
//! - Synchronous and single-threaded; an operator suspends by keeping its
//!   cursor in fields between `next()` calls.
//! - Every page an operator materializes is accounted against its own
//!   `FrameBudgetImpl` of B frames (from `spillway-mem`).
//! - Everything that does not fit in B frames goes to spill segments owned
//!   by the operator instance and removed on exhaustion or `close()`.

pub mod distinct;
pub mod group_by;
pub mod join;
pub mod order_by;
pub mod plan;
pub mod project;
pub mod scan;
pub mod sort;
pub mod traits;

pub use distinct::Distinct;
pub use group_by::GroupBy;
pub use join::{BlockNestedLoopJoin, JoinCondition, SortMergeJoin};
pub use order_by::OrderBy;
pub use plan::{build, PlanNode};
pub use project::Project;
pub use scan::ValuesScan;
pub use sort::{ExternalSort, KeyComparator, SortConfig, SortDirection};
pub use traits::{collect_all, ExecContext, OpError, Operator};
