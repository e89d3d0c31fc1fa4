//! Attribute records for the binary RPC.
//!
//! A record carries the attribute id, a data type tag and the values in a
//! vector typed by that tag. Owner kind and multiplicity do not travel on
//! this transport: the owner kind is inferred from the id, and the
//! multiplicity from the value count. A GROUPED attribute holding exactly
//! one value therefore decodes as ATOMIC.

use puma_types::{AttributeValue, CachedAttributeSet, DataType, Multiplicity, Value};
use serde::{Deserialize, Serialize};

use crate::error::{WireError, WireResult};

/// Typed value vector of an [`AttributeRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordValues {
    Strings(Vec<String>),
    Integers(Vec<i64>),
    Booleans(Vec<bool>),
    /// Milliseconds since the Unix epoch.
    DateTimes(Vec<i64>),
    Doubles(Vec<f64>),
}

impl RecordValues {
    fn data_type(&self) -> DataType {
        match self {
            Self::Strings(_) => DataType::String,
            Self::Integers(_) => DataType::Integer,
            Self::Booleans(_) => DataType::Boolean,
            Self::DateTimes(_) => DataType::DateTime,
            Self::Doubles(_) => DataType::Double,
        }
    }

    fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::String => Self::Strings(Vec::new()),
            DataType::Integer => Self::Integers(Vec::new()),
            DataType::Boolean => Self::Booleans(Vec::new()),
            DataType::DateTime => Self::DateTimes(Vec::new()),
            DataType::Double => Self::Doubles(Vec::new()),
        }
    }

    fn push(&mut self, id: &str, value: &Value) -> WireResult<()> {
        match (self, value) {
            (Self::Strings(v), Value::String(s)) => v.push(s.clone()),
            (Self::Integers(v), Value::Integer(i)) => v.push(*i),
            (Self::Booleans(v), Value::Boolean(b)) => v.push(*b),
            (Self::DateTimes(v), Value::DateTime(ms)) => v.push(*ms),
            (Self::Doubles(v), Value::Double(d)) => v.push(*d),
            (values, value) => {
                return Err(WireError::DataTypeMismatch {
                    id: id.to_string(),
                    tag: values.data_type(),
                    found: value.data_type(),
                });
            }
        }
        Ok(())
    }

    fn into_values(self) -> Vec<Value> {
        match self {
            Self::Strings(v) => v.into_iter().map(Value::String).collect(),
            Self::Integers(v) => v.into_iter().map(Value::Integer).collect(),
            Self::Booleans(v) => v.into_iter().map(Value::Boolean).collect(),
            Self::DateTimes(v) => v.into_iter().map(Value::DateTime).collect(),
            Self::Doubles(v) => v.into_iter().map(Value::Double).collect(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Strings(v) => v.len(),
            Self::Integers(v) => v.len(),
            Self::Booleans(v) => v.len(),
            Self::DateTimes(v) => v.len(),
            Self::Doubles(v) => v.len(),
        }
    }
}

/// One attribute on the binary wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub data_type: DataType,
    pub id: String,
    pub values: RecordValues,
}

impl AttributeRecord {
    /// Encodes an attribute. Every value must match the attribute's data
    /// type; a mismatch aborts the request.
    pub fn encode(attribute: &AttributeValue) -> WireResult<Self> {
        let mut values = RecordValues::empty(attribute.data_type());
        for value in attribute.values() {
            values.push(attribute.id(), value)?;
        }
        Ok(Self {
            data_type: attribute.data_type(),
            id: attribute.id().to_string(),
            values,
        })
    }

    /// Decodes a record back into an attribute.
    ///
    /// The owner kind is inferred from the id prefix. A record with exactly
    /// one value becomes ATOMIC, any other count GROUPED.
    pub fn decode(self) -> WireResult<AttributeValue> {
        if self.values.data_type() != self.data_type {
            return Err(WireError::DataTypeMismatch {
                id: self.id,
                tag: self.data_type,
                found: self.values.data_type(),
            });
        }
        let multiplicity = if self.values.len() == 1 {
            Multiplicity::Atomic
        } else {
            Multiplicity::Grouped
        };
        Ok(AttributeValue::inferred(
            &self.id,
            self.data_type,
            multiplicity,
            self.values.into_values(),
        )?)
    }
}

/// Encodes a cached attribute set in order.
pub fn encode_attributes(attributes: &CachedAttributeSet) -> WireResult<Vec<AttributeRecord>> {
    attributes.iter().map(AttributeRecord::encode).collect()
}
