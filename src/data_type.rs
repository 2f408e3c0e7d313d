// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Data types for decoded column data and materialised row values.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

/// Julian day number of the Unix epoch, 1970-01-01.
const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;

const NANOS_PER_DAY: i128 = 86_400_000_000_000;

/// Rust representation for the INT96 physical type.
///
/// Stored on disk as 12 little-endian bytes: a 64-bit nanosecond-of-day
/// count followed by a 32-bit Julian day number. Only used by legacy
/// timestamp writers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Int96 {
    /// Nanoseconds within the Julian day.
    pub nanos: u64,
    /// Julian day number.
    pub julian_day: u32,
}

impl Int96 {
    /// Decode from the 12-byte on-disk layout.
    pub fn from_le_bytes(bytes: [u8; 12]) -> Self {
        Self {
            nanos: u64::from_le_bytes(bytes[..8].try_into().unwrap()),
            julian_day: u32::from_le_bytes(bytes[8..].try_into().unwrap()),
        }
    }

    /// Nanoseconds since the Unix epoch.
    ///
    /// Computed with full 96-bit arithmetic and saturated into `i64` so a
    /// corrupt day number cannot wrap into a plausible timestamp.
    pub fn to_nanos(self) -> i64 {
        let days = self.julian_day as i64 - JULIAN_DAY_OF_EPOCH;
        let nanos = days as i128 * NANOS_PER_DAY + self.nanos as i128;
        nanos.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// Decoded values of one page, in their physical representation.
///
/// The decoder picks the narrowest variant that fits the physical type.
/// Byte values are [`Bytes`] views into the page buffer, so a page's
/// buffer lives until its decoded chunk is consumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    /// BOOLEAN values.
    Bool(Vec<bool>),
    /// INT32 values.
    Int32(Vec<i32>),
    /// INT64 values.
    Int64(Vec<i64>),
    /// INT96 values.
    Int96(Vec<Int96>),
    /// FLOAT values.
    Float(Vec<f32>),
    /// DOUBLE values.
    Double(Vec<f64>),
    /// BYTE_ARRAY or FIXED_LEN_BYTE_ARRAY values.
    Bytes(Vec<Bytes>),
    /// Dictionary indices, not yet dereferenced.
    Indices(Vec<u32>),
}

impl Values {
    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            Values::Bool(v) => v.len(),
            Values::Int32(v) => v.len(),
            Values::Int64(v) => v.len(),
            Values::Int96(v) => v.len(),
            Values::Float(v) => v.len(),
            Values::Double(v) => v.len(),
            Values::Bytes(v) => v.len(),
            Values::Indices(v) => v.len(),
        }
    }

    /// Whether no values are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A materialised row value.
///
/// The dynamic, nested output type of the decoder: scalar leaves are the
/// results of logical-type conversion, lists and records carry the nested
/// structure reassembled from repetition and definition levels.
///
/// `Text` and record field names are `Arc<str>` so that dictionary
/// dereferencing and row transposition clone cheaply.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer (INT32 and INT64 physical types).
    Int(i64),
    /// An unsigned integer (UINT_* converted types, unsigned logical ints).
    UInt(u64),
    /// A 32-bit float (FLOAT physical type, FLOAT16 logical type).
    Float(f32),
    /// A 64-bit float (DOUBLE physical type, DECIMAL conversions).
    Double(f64),
    /// Raw bytes.
    Bytes(Bytes),
    /// A UTF-8 string.
    Text(Arc<str>),
    /// A calendar date.
    Date(NaiveDate),
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// A list of values; also the container the Dremel assembler builds.
    List(Vec<Value>),
    /// Named fields of a struct, map or object-format row, in field order.
    Record(Vec<(Arc<str>, Value)>),
}

impl Value {
    /// A text value from anything string-like.
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(s.as_ref()))
    }

    /// Field `name` of a record value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields
                .iter()
                .find(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "{v:?}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int96_layout() {
        let mut bytes = [0u8; 12];
        bytes[..8].copy_from_slice(&1_000_000u64.to_le_bytes());
        bytes[8..].copy_from_slice(&2_440_589u32.to_le_bytes());
        let v = Int96::from_le_bytes(bytes);
        assert_eq!(v.nanos, 1_000_000);
        assert_eq!(v.julian_day, 2_440_589);
        // one day and one millisecond after the epoch
        assert_eq!(v.to_nanos(), 86_400_000_000_000 + 1_000_000);
    }

    #[test]
    fn test_int96_epoch() {
        let mut bytes = [0u8; 12];
        bytes[8..].copy_from_slice(&2_440_588u32.to_le_bytes());
        assert_eq!(Int96::from_le_bytes(bytes).to_nanos(), 0);
    }

    #[test]
    fn test_value_display() {
        let v = Value::Record(vec![
            (Arc::from("id"), Value::Int(1)),
            (Arc::from("tags"), Value::List(vec![Value::text("a"), Value::Null])),
        ]);
        assert_eq!(v.to_string(), r#"{id: 1, tags: ["a", null]}"#);
    }
}
