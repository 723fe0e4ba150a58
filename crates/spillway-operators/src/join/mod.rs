//! Equi-joins: block nested loop and sort-merge.

pub mod merge;
pub mod nested_loop;

use serde::{Deserialize, Serialize};

use spillway_core::prelude::{Attribute, Schema};

use crate::traits::OpError;

pub use merge::SortMergeJoin;
pub use nested_loop::BlockNestedLoopJoin;

/// `left = right`. A join matches when every condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub left: Attribute,
    pub right: Attribute,
}

impl JoinCondition {
    pub fn new(left: Attribute, right: Attribute) -> Self {
        Self { left, right }
    }
}

/// Resolve the key positions of `conditions` on both inputs.
pub(crate) fn resolve_keys(
    conditions: &[JoinCondition],
    left: &Schema,
    right: &Schema,
) -> Result<(Vec<usize>, Vec<usize>), OpError> {
    if conditions.is_empty() {
        return Err(OpError::Config("join needs at least one condition".into()));
    }
    let mut l = Vec::with_capacity(conditions.len());
    let mut r = Vec::with_capacity(conditions.len());
    for c in conditions {
        l.push(left.require_index(&c.left)?);
        r.push(right.require_index(&c.right)?);
    }
    Ok((l, r))
}
