//! Shared fixtures for the integration tests: contexts over in-memory
//! storage, small relations, and a child operator that fails on demand.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;

use spillway_core::id::SpillIdGen;
use spillway_core::prelude::{Attribute, Batch, DataType, Schema, Tuple, Value};
use spillway_io::MemoryStorage;
use spillway_mem::{Codec, SpillManager};
use spillway_operators::{ExecContext, OpError, Operator, ValuesScan};

/// Context over a fresh `MemoryStorage`. The storage handle is returned so a
/// test can inspect or damage the bytes behind the spill manager.
pub fn memory_context(page_size: usize) -> (ExecContext, MemoryStorage) {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let ctx = ExecContext::new(Arc::new(spill), Arc::new(SpillIdGen::new()), page_size);
    (ctx, storage)
}

pub fn int_attr(table: &str, name: &str) -> Attribute {
    Attribute::new(table, name, DataType::Int)
}

pub fn str_attr(table: &str, name: &str) -> Attribute {
    Attribute::new(table, name, DataType::Str)
}

/// Single-column relation `table(v INT)`.
pub fn int_schema(table: &str) -> Schema {
    Schema::new(vec![int_attr(table, "v")])
}

/// Two-column relation `table(a INT, b STR)`.
pub fn pair_schema(table: &str, second: &str) -> Schema {
    Schema::new(vec![int_attr(table, "a"), str_attr(table, second)])
}

pub fn int_rows(values: &[i64]) -> Vec<Tuple> {
    values.iter().map(|&v| Tuple::new(vec![Value::Int(v)])).collect()
}

pub fn pair_rows(rows: &[(i64, &str)]) -> Vec<Tuple> {
    rows.iter()
        .map(|&(a, b)| Tuple::new(vec![Value::Int(a), Value::from(b)]))
        .collect()
}

pub fn values(schema: Schema, rows: Vec<Tuple>, page_size: usize) -> Box<dyn Operator> {
    Box::new(ValuesScan::new(schema, rows, page_size))
}

/// Deterministic pseudo-random integers in `0..modulo` (64-bit LCG).
pub fn scrambled_ints(count: usize, modulo: i64, seed: u64) -> Vec<i64> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as i64).rem_euclid(modulo)
        })
        .collect()
}

pub fn ints_of(tuples: &[Tuple]) -> Vec<i64> {
    tuples
        .iter()
        .map(|t| match t.value(0) {
            Value::Int(v) => *v,
            other => panic!("expected an int, got {other}"),
        })
        .collect()
}

/// Canonical order for comparing outputs as multisets.
pub fn sorted(mut tuples: Vec<Tuple>) -> Vec<Tuple> {
    tuples.sort_by(|a, b| a.compare_all(b));
    tuples
}

/// Reference equi-join over plain vectors.
pub fn naive_join(
    left: &[Tuple],
    right: &[Tuple],
    left_keys: &[usize],
    right_keys: &[usize],
) -> Vec<Tuple> {
    let mut out = Vec::new();
    for l in left {
        for r in right {
            if l.compare_cross(r, left_keys, right_keys) == Ordering::Equal {
                out.push(l.join_with(r));
            }
        }
    }
    out
}

/// When a `FailingScan` gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Open,
    /// After this many pages were handed out.
    Page(usize),
}

/// A `ValuesScan` that fails at a chosen point.
pub struct FailingScan {
    inner: ValuesScan,
    fail_at: FailAt,
    pages: usize,
}

impl FailingScan {
    pub fn boxed(
        schema: Schema,
        rows: Vec<Tuple>,
        page_size: usize,
        fail_at: FailAt,
    ) -> Box<dyn Operator> {
        Box::new(Self {
            inner: ValuesScan::new(schema, rows, page_size),
            fail_at,
            pages: 0,
        })
    }
}

impl Operator for FailingScan {
    fn name(&self) -> &'static str {
        "failing_scan"
    }

    fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        if self.fail_at == FailAt::Open {
            return Err(OpError::Exec("injected open failure".into()));
        }
        self.pages = 0;
        self.inner.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        if self.fail_at == FailAt::Page(self.pages) {
            return Err(OpError::Exec(format!("injected failure after {} pages", self.pages)));
        }
        self.pages += 1;
        self.inner.next()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
