//! Buffer-constrained external sort and its building blocks.
//!
//! `ExternalSort` is the engine behind `Distinct`, `GroupBy`, `OrderBy` and
//! both inputs of `SortMergeJoin`.

pub mod external;
pub mod run;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use spillway_core::prelude::{Attribute, Schema};
use spillway_core::tuple::Tuple;

use crate::traits::OpError;

pub use external::ExternalSort;
pub use run::{RunGenerator, Runs, SortedRun};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// What to sort on and with how many buffer frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Sort keys in priority order. Empty means every column, left to right.
    pub keys: Vec<Attribute>,
    #[serde(default)]
    pub direction: SortDirection,
    /// Drop tuples whose keys equal the previously emitted tuple's.
    #[serde(default)]
    pub distinct: bool,
    /// Buffer frames (B). Must be at least 2.
    pub frames: usize,
}

impl SortConfig {
    pub fn ascending(keys: Vec<Attribute>, frames: usize) -> Self {
        Self {
            keys,
            direction: SortDirection::Ascending,
            distinct: false,
            frames,
        }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Direction-aware tuple comparator over resolved key positions.
#[derive(Debug, Clone)]
pub struct KeyComparator {
    indices: Vec<usize>,
    direction: SortDirection,
}

impl KeyComparator {
    /// Resolve `keys` against `schema`. An empty key list compares whole tuples.
    pub fn new(
        schema: &Schema,
        keys: &[Attribute],
        direction: SortDirection,
    ) -> Result<Self, OpError> {
        let indices = if keys.is_empty() {
            (0..schema.len()).collect()
        } else {
            schema.indices_of(keys)?
        };
        Ok(Self { indices, direction })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn compare(&self, a: &Tuple, b: &Tuple) -> Ordering {
        let ord = a.compare_on(b, &self.indices);
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    /// Key equality, regardless of direction.
    pub fn same_key(&self, a: &Tuple, b: &Tuple) -> bool {
        a.compare_on(b, &self.indices) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spillway_core::prelude::{DataType, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            Attribute::new("t", "a", DataType::Int),
            Attribute::new("t", "b", DataType::Str),
        ])
    }

    fn t(a: i64, b: &str) -> Tuple {
        Tuple::new(vec![Value::Int(a), Value::from(b)])
    }

    #[test]
    fn later_keys_break_ties() {
        let keys = vec![
            Attribute::new("t", "a", DataType::Int),
            Attribute::new("t", "b", DataType::Str),
        ];
        let cmp = KeyComparator::new(&schema(), &keys, SortDirection::Ascending).unwrap();
        assert_eq!(cmp.compare(&t(1, "b"), &t(1, "a")), Ordering::Greater);
        assert_eq!(cmp.compare(&t(0, "z"), &t(1, "a")), Ordering::Less);
    }

    #[test]
    fn descending_reverses_but_keeps_equality() {
        let keys = vec![Attribute::new("t", "a", DataType::Int)];
        let cmp = KeyComparator::new(&schema(), &keys, SortDirection::Descending).unwrap();
        assert_eq!(cmp.compare(&t(1, "x"), &t(2, "x")), Ordering::Greater);
        assert!(cmp.same_key(&t(2, "x"), &t(2, "y")));
    }

    #[test]
    fn empty_keys_mean_all_columns() {
        let cmp = KeyComparator::new(&schema(), &[], SortDirection::Ascending).unwrap();
        assert_eq!(cmp.indices(), &[0, 1]);
        assert!(!cmp.same_key(&t(1, "x"), &t(1, "y")));
    }

    #[test]
    fn unknown_key_is_a_schema_error() {
        let keys = vec![Attribute::new("u", "a", DataType::Int)];
        let err = KeyComparator::new(&schema(), &keys, SortDirection::Ascending).unwrap_err();
        assert!(matches!(err, OpError::Schema(_)));
    }
}
