//! ORDER BY: sort on the given attributes in either direction.

use spillway_core::prelude::{Attribute, Schema};
use spillway_core::tuple::Batch;

use crate::sort::{ExternalSort, SortConfig, SortDirection};
use crate::traits::{ExecContext, OpError, Operator};

pub struct OrderBy {
    sort: ExternalSort,
}

impl OrderBy {
    pub fn new(
        input: Box<dyn Operator>,
        frames: usize,
        attributes: Vec<Attribute>,
        direction: SortDirection,
        ctx: ExecContext,
    ) -> Self {
        let config = SortConfig::ascending(attributes, frames).with_direction(direction);
        Self {
            sort: ExternalSort::new(input, config, ctx),
        }
    }

    pub fn sort(&self) -> &ExternalSort {
        &self.sort
    }
}

impl Operator for OrderBy {
    fn name(&self) -> &'static str {
        "order_by"
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
