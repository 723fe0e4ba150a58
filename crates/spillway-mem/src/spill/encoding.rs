//! Binary tuple encoding used inside spill frames.
//!
//! Layout (all integers little-endian):
//! tuple : [ arity: u16 ][ value … ]
//! value : [ tag: u8 ] then
//!         Null -> nothing
//!         Int  -> i64
//!         Real -> f64 bits (u64)
//!         Str  -> [ len: u32 ][ utf8 bytes ]
//!
//! The format version lives in the segment header; bump `segment::VERSION`
//! when this layout changes.

use spillway_core::tuple::Tuple;
use spillway_core::types::Value;

use crate::error::{Error, Result};

const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_REAL: u8 = 2;
const TAG_STR: u8 = 3;

pub fn encode_tuple(tuple: &Tuple, out: &mut Vec<u8>) -> Result<()> {
    let arity = u16::try_from(tuple.len())
        .map_err(|_| Error::Encoding(format!("tuple arity {} exceeds u16", tuple.len())))?;
    out.extend_from_slice(&arity.to_le_bytes());
    for value in &tuple.values {
        match value {
            Value::Null => out.push(TAG_NULL),
            Value::Int(i) => {
                out.push(TAG_INT);
                out.extend_from_slice(&i.to_le_bytes());
            }
            Value::Real(r) => {
                out.push(TAG_REAL);
                out.extend_from_slice(&r.to_bits().to_le_bytes());
            }
            Value::Str(s) => {
                let len = u32::try_from(s.len())
                    .map_err(|_| Error::Encoding(format!("string of {} bytes", s.len())))?;
                out.push(TAG_STR);
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
    Ok(())
}

pub fn encode_tuples<'a>(
    tuples: impl IntoIterator<Item = &'a Tuple>,
    out: &mut Vec<u8>,
) -> Result<()> {
    for t in tuples {
        encode_tuple(t, out)?;
    }
    Ok(())
}

/// Decode exactly `count` tuples; trailing or missing bytes are an error.
pub fn decode_tuples(bytes: &[u8], count: usize) -> Result<Vec<Tuple>> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut tuples = Vec::with_capacity(count);
    for _ in 0..count {
        tuples.push(cursor.tuple()?);
    }
    if cursor.pos != bytes.len() {
        return Err(Error::Encoding(format!(
            "{} trailing bytes after {count} tuples",
            bytes.len() - cursor.pos
        )));
    }
    Ok(tuples)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::Encoding(format!("need {n} bytes at offset {}", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn tuple(&mut self) -> Result<Tuple> {
        let arity = u16::from_le_bytes(self.array()?) as usize;
        let mut values = Vec::with_capacity(arity);
        for _ in 0..arity {
            values.push(self.value()?);
        }
        Ok(Tuple::new(values))
    }

    fn value(&mut self) -> Result<Value> {
        let [tag] = self.array::<1>()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_INT => Ok(Value::Int(i64::from_le_bytes(self.array()?))),
            TAG_REAL => Ok(Value::Real(f64::from_bits(u64::from_le_bytes(self.array()?)))),
            TAG_STR => {
                let len = u32::from_le_bytes(self.array()?) as usize;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|e| Error::Encoding(format!("invalid utf8: {e}")))?;
                Ok(Value::Str(s.to_string()))
            }
            other => Err(Error::Encoding(format!("unknown value tag {other}"))),
        }
    }
}
