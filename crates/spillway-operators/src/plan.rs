//! Serializable operator-tree descriptions and the factory that builds them.
//!
//! A `PlanNode` carries only configuration values, so the same plan can be
//! built any number of times; each `build` call returns a fresh, independent
//! operator tree with its own spill ids.

use serde::{Deserialize, Serialize};

use spillway_core::prelude::{Attribute, Schema};
use spillway_core::tuple::Tuple;

use crate::distinct::Distinct;
use crate::group_by::GroupBy;
use crate::join::{BlockNestedLoopJoin, JoinCondition, SortMergeJoin};
use crate::order_by::OrderBy;
use crate::project::Project;
use crate::scan::ValuesScan;
use crate::sort::{ExternalSort, SortConfig, SortDirection};
use crate::traits::{ExecContext, OpError, Operator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanNode {
    Values {
        schema: Schema,
        rows: Vec<Tuple>,
    },
    Sort {
        input: Box<PlanNode>,
        config: SortConfig,
    },
    OrderBy {
        input: Box<PlanNode>,
        attributes: Vec<Attribute>,
        #[serde(default)]
        direction: SortDirection,
        frames: usize,
    },
    Distinct {
        input: Box<PlanNode>,
        #[serde(default)]
        attributes: Vec<Attribute>,
        frames: usize,
    },
    GroupBy {
        input: Box<PlanNode>,
        attributes: Vec<Attribute>,
        frames: usize,
    },
    Project {
        input: Box<PlanNode>,
        attributes: Vec<Attribute>,
    },
    BlockNestedLoopJoin {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        conditions: Vec<JoinCondition>,
        frames: usize,
    },
    SortMergeJoin {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        conditions: Vec<JoinCondition>,
        frames: usize,
    },
}

impl PlanNode {
    pub fn values(schema: Schema, rows: Vec<Tuple>) -> Self {
        PlanNode::Values { schema, rows }
    }

    /// Operator name the node builds into.
    pub fn op_name(&self) -> &'static str {
        match self {
            PlanNode::Values { .. } => "values",
            PlanNode::Sort { .. } => "sort_external",
            PlanNode::OrderBy { .. } => "order_by",
            PlanNode::Distinct { .. } => "distinct",
            PlanNode::GroupBy { .. } => "group_by",
            PlanNode::Project { .. } => "project",
            PlanNode::BlockNestedLoopJoin { .. } => "join_block_nested_loop",
            PlanNode::SortMergeJoin { .. } => "join_sort_merge",
        }
    }
}

/// Build a fresh operator tree for `node`.
pub fn build(node: &PlanNode, ctx: &ExecContext) -> Result<Box<dyn Operator>, OpError> {
    let op: Box<dyn Operator> = match node {
        PlanNode::Values { schema, rows } => {
            Box::new(ValuesScan::new(schema.clone(), rows.clone(), ctx.page_size))
        }
        PlanNode::Sort { input, config } => Box::new(ExternalSort::new(
            build(input, ctx)?,
            config.clone(),
            ctx.clone(),
        )),
        PlanNode::OrderBy {
            input,
            attributes,
            direction,
            frames,
        } => Box::new(OrderBy::new(
            build(input, ctx)?,
            *frames,
            attributes.clone(),
            *direction,
            ctx.clone(),
        )),
        PlanNode::Distinct {
            input,
            attributes,
            frames,
        } => Box::new(Distinct::new(
            build(input, ctx)?,
            *frames,
            attributes.clone(),
            ctx.clone(),
        )),
        PlanNode::GroupBy {
            input,
            attributes,
            frames,
        } => Box::new(GroupBy::new(
            build(input, ctx)?,
            *frames,
            attributes.clone(),
            ctx.clone(),
        )),
        PlanNode::Project { input, attributes } => Box::new(Project::new(
            build(input, ctx)?,
            attributes.clone(),
            ctx.clone(),
        )?),
        PlanNode::BlockNestedLoopJoin {
            left,
            right,
            conditions,
            frames,
        } => Box::new(BlockNestedLoopJoin::new(
            build(left, ctx)?,
            build(right, ctx)?,
            conditions.clone(),
            *frames,
            ctx.clone(),
        )),
        PlanNode::SortMergeJoin {
            left,
            right,
            conditions,
            frames,
        } => Box::new(SortMergeJoin::new(
            build(left, ctx)?,
            build(right, ctx)?,
            conditions.clone(),
            *frames,
            ctx.clone(),
        )),
    };
    tracing::trace!(op = op.name(), "operator built");
    Ok(op)
}
