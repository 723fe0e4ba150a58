//! In-memory leaf producer.

use std::collections::VecDeque;

use spillway_core::prelude::Schema;
use spillway_core::tuple::{Batch, Tuple};

use crate::traits::{OpError, Operator};

/// Emits a fixed list of tuples in pages sized by `page_size`.
pub struct ValuesScan {
    schema: Schema,
    rows: Vec<Tuple>,
    page_size: usize,
    pending: Option<VecDeque<Tuple>>,
    capacity: usize,
}

impl ValuesScan {
    pub fn new(schema: Schema, rows: Vec<Tuple>, page_size: usize) -> Self {
        Self {
            schema,
            rows,
            page_size,
            pending: None,
            capacity: 0,
        }
    }

    /// Tuples per emitted page. Zero until opened.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Operator for ValuesScan {
    fn name(&self) -> &'static str {
        "values"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        if let Some(bad) = self.rows.iter().find(|t| t.len() != self.schema.len()) {
            return Err(OpError::Schema(format!(
                "row of arity {} does not match schema of arity {}",
                bad.len(),
                self.schema.len()
            )));
        }
        self.capacity = Batch::capacity_for(self.page_size, self.schema.tuple_size())?;
        self.pending = Some(self.rows.iter().cloned().collect());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };
        if pending.is_empty() {
            self.pending = None;
            return Ok(None);
        }
        let mut batch = Batch::new(self.capacity);
        while !batch.is_full() {
            match pending.pop_front() {
                Some(t) => batch.push(t),
                None => break,
            }
        }
        Ok(Some(batch))
    }

    fn close(&mut self) {
        self.pending = None;
    }
}
