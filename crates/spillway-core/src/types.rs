//! Typed values carried inside tuples.
//!
//! Values are totally ordered so that sort, merge and join can share one
//! comparator. `Null` sorts first; integers and reals compare numerically.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Str(String),
}

impl Value {
    /// Declared type of this value; `Null` has none.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Int),
            Value::Real(_) => Some(DataType::Real),
            Value::Str(_) => Some(DataType::Str),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Total order used by every comparator in the engine.
    pub fn compare(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Int(x), Int(y)) => x.cmp(y),
            (Real(x), Real(y)) => cmp_f64(*x, *y),
            (Int(x), Real(y)) => cmp_int_real(*x, *y),
            (Real(x), Int(y)) => cmp_int_real(*y, *x).reverse(),
            (Str(x), Str(y)) => x.cmp(y),
            // Mixed string/number: order by kind rank
            _ => kind_rank(self).cmp(&kind_rank(other)),
        }
    }
}

fn cmp_f64(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison; casting the int to f64 would round above 2^53.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if r.is_nan() || r >= TWO_POW_63 {
        return Ordering::Less;
    }
    if r < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_f64(whole, r),
        ord => ord,
    }
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Int(_) | Value::Real(_) => 1,
        Value::Str(_) => 2,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_sort_first() {
        assert_eq!(Value::Null.compare(&Value::Int(-5)), Ordering::Less);
        assert_eq!(Value::Str("a".into()).compare(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Value::Int(2).compare(&Value::Real(2.0)), Ordering::Equal);
        assert_eq!(Value::Real(1.5).compare(&Value::Int(2)), Ordering::Less);
        assert_eq!(Value::Real(f64::NAN).compare(&Value::Real(1e300)), Ordering::Greater);
    }

    #[test]
    fn large_ints_compare_exactly_against_reals() {
        let big = 1i64 << 53;
        let edge = Value::Real(big as f64);
        assert_eq!(Value::Int(big).compare(&edge), Ordering::Equal);
        assert_eq!(Value::Int(big + 1).compare(&edge), Ordering::Greater);
        assert_eq!(edge.compare(&Value::Int(big + 1)), Ordering::Less);
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Real(9.3e18)), Ordering::Less);
        assert_eq!(Value::Int(i64::MIN).compare(&Value::Real(-9.3e18)), Ordering::Greater);
        assert_eq!(Value::Int(i64::MIN).compare(&Value::Real(i64::MIN as f64)), Ordering::Equal);
        assert_eq!(Value::Int(0).compare(&Value::Real(-0.5)), Ordering::Greater);
        assert_eq!(Value::Int(-1).compare(&Value::Real(-0.5)), Ordering::Less);
        assert_eq!(Value::Int(3).compare(&Value::Real(f64::INFINITY)), Ordering::Less);
        assert_eq!(Value::Int(3).compare(&Value::Real(f64::NEG_INFINITY)), Ordering::Greater);
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Real(f64::NAN)), Ordering::Less);
    }

    #[test]
    fn mixed_numbers_sort_consistently() {
        let big = 1i64 << 53;
        let mut values = vec![
            Value::Int(big + 1),
            Value::Real(big as f64),
            Value::Int(big),
            Value::Real(0.5),
            Value::Int(big - 1),
        ];
        values.sort_by(|a, b| a.compare(b));
        assert_eq!(values[0], Value::Real(0.5));
        assert_eq!(values[1], Value::Int(big - 1));
        assert_eq!(values[4], Value::Int(big + 1));
        for w in values.windows(2) {
            assert_ne!(w[0].compare(&w[1]), Ordering::Greater);
        }
    }

    #[test]
    fn strings_rank_after_numbers() {
        assert_eq!(Value::Str("0".into()).compare(&Value::Int(99)), Ordering::Greater);
        assert_eq!(Value::from("abc").compare(&Value::from("abd")), Ordering::Less);
    }
}
