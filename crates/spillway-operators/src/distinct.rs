//! Duplicate elimination via the sort engine.

use spillway_core::prelude::{Attribute, Schema};
use spillway_core::tuple::Batch;

use crate::sort::{ExternalSort, SortConfig};
use crate::traits::{ExecContext, OpError, Operator};

/// Emits one tuple per distinct key, in ascending key order.
///
/// With an empty attribute list the whole tuple is the key. With a non-empty
/// list, the first tuple (in sort order) of each key group is kept.
/// Needs `frames >= 3` unless the input fits in two pages (see [`ExternalSort`]).
pub struct Distinct {
    sort: ExternalSort,
}

impl Distinct {
    pub fn new(
        input: Box<dyn Operator>,
        frames: usize,
        attributes: Vec<Attribute>,
        ctx: ExecContext,
    ) -> Self {
        let config = SortConfig::ascending(attributes, frames).with_distinct(true);
        Self {
            sort: ExternalSort::new(input, config, ctx),
        }
    }

    pub fn sort(&self) -> &ExternalSort {
        &self.sort
    }
}

impl Operator for Distinct {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn schema(&self) -> &Schema {
        self.sort.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.sort.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        self.sort.next()
    }

    fn close(&mut self) {
        self.sort.close()
    }
}
