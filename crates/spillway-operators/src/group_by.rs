//! Grouping: tuples with equal grouping attributes come out contiguously.

use spillway_core::prelude::{Attribute, Schema};
use spillway_core::tuple::Batch;

use crate::sort::{ExternalSort, SortConfig};
use crate::traits::{ExecContext, OpError, Operator};

pub struct GroupBy {
    sort: ExternalSort,
}

impl GroupBy {
    pub fn new(
        input: Box<dyn Operator>,
        frames: usize,
        attributes: Vec<Attribute>,
        ctx: ExecContext,
    ) -> Self {
        Self {
            sort: ExternalSort::new(input, SortConfig::ascending(attributes, frames), ctx),
        }
    }

    pub fn sort(&self) -> &ExternalSort {
        &self.sort
    }
}

impl Operator for GroupBy {
    fn name(&self) -> &'static str {
        "group_by"
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
