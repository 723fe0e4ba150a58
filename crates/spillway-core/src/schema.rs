//! Logical schema types. Pure data; no I/O here.
//!
//! A `Schema` is the tuple layout an operator produces. Its `tuple_size()`
//! (sum of attribute widths) drives page capacity; `index_of` resolves
//! attributes to positional indices used by comparators and projections.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Real,
    Str,
}

impl DataType {
    /// Width in bytes an attribute of this type occupies on a page unless it
    /// declares its own.
    pub const fn default_width(self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Real => 4,
            DataType::Str => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    #[default]
    None,
    Max,
    Min,
    Count,
    Sum,
    Avg,
}

impl AggregateKind {
    pub fn is_aggregate(self) -> bool {
        self != AggregateKind::None
    }

    /// Type of the value this aggregate produces from an input of `input`.
    pub fn result_type(self, input: DataType) -> DataType {
        match self {
            AggregateKind::Count => DataType::Int,
            AggregateKind::Avg => DataType::Real,
            _ => input,
        }
    }
}

impl std::fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AggregateKind::None => "NONE",
            AggregateKind::Max => "MAX",
            AggregateKind::Min => "MIN",
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
        };
        f.write_str(s)
    }
}

/// A column identified by its owning table and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub table: String,
    pub name: String,
    pub data_type: DataType,
    pub width: usize,
    pub aggregate: AggregateKind,
}

impl Attribute {
    pub fn new(table: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            data_type,
            width: data_type.default_width(),
            aggregate: AggregateKind::None,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregateKind) -> Self {
        self.aggregate = aggregate;
        self
    }

    /// The same column without any aggregate applied.
    pub fn base_attribute(&self) -> Attribute {
        Attribute {
            aggregate: AggregateKind::None,
            ..self.clone()
        }
    }

    /// Column identity: same table and same name.
    pub fn same_column(&self, other: &Attribute) -> bool {
        self.table == other.table && self.name == other.name
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.aggregate.is_aggregate() {
            write!(f, "{}({})", self.aggregate, self.qualified_name())
        } else {
            f.write_str(&self.qualified_name())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attribute(&self, idx: usize) -> Option<&Attribute> {
        self.attributes.get(idx)
    }

    pub fn index_of(&self, attr: &Attribute) -> Option<usize> {
        self.attributes.iter().position(|a| a.same_column(attr))
    }

    /// Like `index_of`, but a missing attribute is a schema error.
    pub fn require_index(&self, attr: &Attribute) -> Result<usize> {
        self.index_of(attr)
            .ok_or_else(|| Error::Schema(format!("attribute {attr} not found in schema")))
    }

    /// Resolve every attribute of `attrs` to its position.
    pub fn indices_of(&self, attrs: &[Attribute]) -> Result<Vec<usize>> {
        attrs.iter().map(|a| self.require_index(a)).collect()
    }

    /// Bytes one tuple of this schema occupies on a page.
    pub fn tuple_size(&self) -> usize {
        self.attributes.iter().map(|a| a.width).sum()
    }

    /// Projection onto `attrs`. Aggregate attributes take the type their
    /// aggregate produces.
    pub fn sub_schema(&self, attrs: &[Attribute]) -> Result<Schema> {
        let mut out = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let idx = self.require_index(&attr.base_attribute())?;
            let base = &self.attributes[idx];
            let data_type = attr.aggregate.result_type(base.data_type);
            let width = if data_type == base.data_type {
                base.width
            } else {
                data_type.default_width()
            };
            out.push(Attribute {
                table: base.table.clone(),
                name: base.name.clone(),
                data_type,
                width,
                aggregate: attr.aggregate,
            });
        }
        Ok(Schema::new(out))
    }

    /// Output layout of a join: left attributes followed by right ones.
    pub fn join(&self, right: &Schema) -> Schema {
        let mut attributes = self.attributes.clone();
        attributes.extend(right.attributes.iter().cloned());
        Schema::new(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp() -> Schema {
        Schema::new(vec![
            Attribute::new("emp", "id", DataType::Int),
            Attribute::new("emp", "name", DataType::Str).with_width(20),
            Attribute::new("emp", "salary", DataType::Real),
        ])
    }

    #[test]
    fn index_of_ignores_type_and_aggregate() {
        let s = emp();
        let salary =
            Attribute::new("emp", "salary", DataType::Int).with_aggregate(AggregateKind::Max);
        assert_eq!(s.index_of(&salary), Some(2));
        assert_eq!(s.index_of(&Attribute::new("dept", "id", DataType::Int)), None);
    }

    #[test]
    fn tuple_size_sums_widths() {
        assert_eq!(emp().tuple_size(), 4 + 20 + 4);
    }

    #[test]
    fn sub_schema_applies_aggregate_types() {
        let s = emp();
        let proj = s
            .sub_schema(&[
                Attribute::new("emp", "name", DataType::Str),
                Attribute::new("emp", "id", DataType::Int).with_aggregate(AggregateKind::Avg),
                Attribute::new("emp", "name", DataType::Str).with_aggregate(AggregateKind::Count),
            ])
            .unwrap();
        assert_eq!(proj.attributes[0].width, 20);
        assert_eq!(proj.attributes[1].data_type, DataType::Real);
        assert_eq!(proj.attributes[2].data_type, DataType::Int);
        assert_eq!(proj.attributes[2].width, 4);
    }

    #[test]
    fn sub_schema_rejects_unknown_attribute() {
        let err = emp()
            .sub_schema(&[Attribute::new("emp", "bonus", DataType::Int)])
            .unwrap_err();
        assert!(err.to_string().contains("emp.bonus"));
    }
}
