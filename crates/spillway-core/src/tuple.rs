//! Row-oriented tuples and fixed-capacity pages (`Batch`).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> &Value {
        &self.values[idx]
    }

    /// Lexicographic comparison over `indices`; the first non-equal position wins.
    pub fn compare_on(&self, other: &Tuple, indices: &[usize]) -> Ordering {
        for &i in indices {
            match self.values[i].compare(&other.values[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Compares every position in order.
    pub fn compare_all(&self, other: &Tuple) -> Ordering {
        for (x, y) in self.values.iter().zip(other.values.iter()) {
            match x.compare(y) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.values.len().cmp(&other.values.len())
    }

    /// Compares `self[left[i]]` with `other[right[i]]` pair by pair.
    pub fn compare_cross(&self, other: &Tuple, left: &[usize], right: &[usize]) -> Ordering {
        for (&l, &r) in left.iter().zip(right.iter()) {
            match self.values[l].compare(&other.values[r]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Equi-join predicate: every key pair must be equal.
    pub fn joins_with(&self, other: &Tuple, left: &[usize], right: &[usize]) -> bool {
        self.compare_cross(other, left, right) == Ordering::Equal
    }

    /// Concatenation used to build join output.
    pub fn join_with(&self, other: &Tuple) -> Tuple {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend(self.values.iter().cloned());
        values.extend(other.values.iter().cloned());
        Tuple { values }
    }

    pub fn project(&self, indices: &[usize]) -> Tuple {
        Tuple {
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Tuple { values }
    }
}

/// One page of tuples. Never holds more than `capacity` tuples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    capacity: usize,
    tuples: Vec<Tuple>,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tuples: Vec::with_capacity(capacity),
        }
    }

    /// Number of tuples per page: `floor(page_size / tuple_size)`.
    ///
    /// A result of zero means a single tuple does not fit on a page, which
    /// is a configuration error.
    pub fn capacity_for(page_size: usize, tuple_size: usize) -> Result<usize> {
        if tuple_size == 0 {
            return Err(Error::Config("tuple size must be positive".into()));
        }
        let capacity = page_size / tuple_size;
        if capacity == 0 {
            return Err(Error::Config(format!(
                "page size {page_size} is smaller than tuple size {tuple_size}"
            )));
        }
        Ok(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tuples.len() >= self.capacity
    }

    /// Appends a tuple. Callers check `is_full` first; overfilling a page is
    /// a bug in the caller.
    pub fn push(&mut self, tuple: Tuple) {
        assert!(
            !self.is_full(),
            "batch overflow: capacity {} already reached",
            self.capacity
        );
        self.tuples.push(tuple);
    }

    pub fn get(&self, idx: usize) -> Option<&Tuple> {
        self.tuples.get(idx)
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}
