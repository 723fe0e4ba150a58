//! Projection, with optional whole-input aggregation.
//!
//! Without aggregate attributes, every input tuple maps to one output tuple.
//! With at least one, the whole input collapses to a single tuple.

use std::cmp::Ordering;
use std::collections::VecDeque;

use spillway_core::prelude::{AggregateKind, Attribute, Schema, Value};
use spillway_core::tuple::{Batch, Tuple};

use crate::traits::{ExecContext, OpError, Operator};

/// Running state of one output column in aggregate mode.
#[derive(Debug, Clone)]
enum Accumulator {
    /// Non-aggregate column: the first value seen.
    First(Option<Value>),
    Max(Value),
    Min(Value),
    Count(i64),
    Sum(Value),
    Avg { sum: f64, count: i64 },
}

impl Accumulator {
    fn new(kind: AggregateKind) -> Self {
        match kind {
            AggregateKind::None => Accumulator::First(None),
            AggregateKind::Max => Accumulator::Max(Value::Null),
            AggregateKind::Min => Accumulator::Min(Value::Null),
            AggregateKind::Count => Accumulator::Count(0),
            AggregateKind::Sum => Accumulator::Sum(Value::Int(0)),
            AggregateKind::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    fn kind(&self) -> AggregateKind {
        match self {
            Accumulator::First(_) => AggregateKind::None,
            Accumulator::Max(_) => AggregateKind::Max,
            Accumulator::Min(_) => AggregateKind::Min,
            Accumulator::Count(_) => AggregateKind::Count,
            Accumulator::Sum(_) => AggregateKind::Sum,
            Accumulator::Avg { .. } => AggregateKind::Avg,
        }
    }

    /// Fold one value in. NULLs are ignored by every aggregate.
    fn update(&mut self, value: &Value) -> Result<(), OpError> {
        if let Accumulator::First(slot) = self {
            if slot.is_none() {
                *slot = Some(value.clone());
            }
            return Ok(());
        }
        if value.is_null() {
            return Ok(());
        }
        if let Accumulator::Count(n) = self {
            *n += 1;
            return Ok(());
        }
        if value.as_f64().is_none() {
            return Err(OpError::AggregateType {
                kind: self.kind(),
                value: value.clone(),
            });
        }

        match self {
            Accumulator::Max(best) => {
                if best.is_null() || value.compare(best) == Ordering::Greater {
                    *best = value.clone();
                }
            }
            Accumulator::Min(best) => {
                if best.is_null() || value.compare(best) == Ordering::Less {
                    *best = value.clone();
                }
            }
            Accumulator::Sum(total) => *total = add(total, value)?,
            Accumulator::Avg { sum, count } => {
                *sum += value.as_f64().unwrap_or_default();
                *count += 1;
            }
            Accumulator::First(_) | Accumulator::Count(_) => {}
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::First(v) => v.unwrap_or(Value::Null),
            Accumulator::Max(v) | Accumulator::Min(v) | Accumulator::Sum(v) => v,
            Accumulator::Count(n) => Value::Int(n),
            Accumulator::Avg { count: 0, .. } => Value::Null,
            Accumulator::Avg { sum, count } => Value::Real(sum / count as f64),
        }
    }
}

/// Integer sums stay integral; any real operand promotes the sum to real.
fn add(total: &Value, value: &Value) -> Result<Value, OpError> {
    match (total, value) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| OpError::Exec(format!("integer overflow in SUM: {a} + {b}"))),
        _ => {
            let a = total.as_f64().unwrap_or_default();
            let b = value.as_f64().unwrap_or_default();
            Ok(Value::Real(a + b))
        }
    }
}

pub struct Project {
    input: Box<dyn Operator>,
    attributes: Vec<Attribute>,
    ctx: ExecContext,
    schema: Schema,
    aggregate: bool,

    indices: Vec<usize>,
    capacity: usize,
    carry: VecDeque<Tuple>,
    input_done: bool,
    opened: bool,
    finished: bool,
}

impl Project {
    /// Fails when an attribute is not part of the input schema.
    pub fn new(
        input: Box<dyn Operator>,
        attributes: Vec<Attribute>,
        ctx: ExecContext,
    ) -> Result<Self, OpError> {
        let schema = input.schema().sub_schema(&attributes)?;
        let aggregate = attributes.iter().any(|a| a.aggregate.is_aggregate());
        Ok(Self {
            input,
            attributes,
            ctx,
            schema,
            aggregate,
            indices: Vec::new(),
            capacity: 0,
            carry: VecDeque::new(),
            input_done: false,
            opened: false,
            finished: false,
        })
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    fn next_projected(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        loop {
            while !out.is_full() {
                match self.carry.pop_front() {
                    Some(t) => out.push(t),
                    None => break,
                }
            }
            if out.is_full() || self.input_done {
                break;
            }
            match self.input.next()? {
                Some(batch) => self
                    .carry
                    .extend(batch.iter().map(|t| t.project(&self.indices))),
                None => self.input_done = true,
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn next_aggregated(&mut self) -> Result<Option<Batch>, OpError> {
        if self.input_done {
            return Ok(None);
        }
        let mut accs: Vec<Accumulator> = self
            .attributes
            .iter()
            .map(|a| Accumulator::new(a.aggregate))
            .collect();
        while let Some(batch) = self.input.next()? {
            for t in &batch {
                for (acc, &idx) in accs.iter_mut().zip(&self.indices) {
                    acc.update(t.value(idx))?;
                }
            }
        }
        self.input_done = true;

        let row = Tuple::new(accs.into_iter().map(Accumulator::finish).collect());
        let mut out = Batch::new(self.capacity);
        out.push(row);
        Ok(Some(out))
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.finished = false;
        self.input_done = false;
        self.carry.clear();
        let result = (|| -> Result<(), OpError> {
            let bases: Vec<Attribute> =
                self.attributes.iter().map(Attribute::base_attribute).collect();
            self.indices = self.input.schema().indices_of(&bases)?;
            self.capacity = self.ctx.capacity_for(&self.schema)?;
            self.input.open()
        })();
        match result {
            Ok(()) => {
                self.opened = true;
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        if self.finished {
            return Ok(None);
        }
        if !self.opened {
            return Err(OpError::Exec("project: next() before open()".into()));
        }
        let batch = if self.aggregate {
            self.next_aggregated()?
        } else {
            self.next_projected()?
        };
        if batch.is_none() {
            self.close();
        }
        Ok(batch)
    }

    fn close(&mut self) {
        self.input.close();
        self.carry.clear();
        self.opened = false;
        self.finished = true;
    }
}
