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

//! Conversion from physical page values to logical row values, driven by
//! the column's converted and logical type annotations.
//!
//! Temporal and string materialisation goes through caller-replaceable
//! [`Parsers`] hooks; the defaults produce [`chrono`] values.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Days, NaiveDate};

use crate::basic::{ConvertedType, Encoding, LogicalType, TimeUnit, Type};
use crate::data_type::{Value, Values};
use crate::errors::{ParquetError, Result};
use crate::schema::types::SchemaElement;
use crate::wkb::decode_wkb;

/// Caller-replaceable hooks that materialise temporal and string values.
pub struct Parsers {
    /// Called for TIMESTAMP_MILLIS values.
    pub timestamp_from_milliseconds: Box<dyn Fn(i64) -> Value + Send + Sync>,
    /// Called for TIMESTAMP_MICROS values.
    pub timestamp_from_microseconds: Box<dyn Fn(i64) -> Value + Send + Sync>,
    /// Called for nanosecond timestamps, including decoded INT96.
    pub timestamp_from_nanoseconds: Box<dyn Fn(i64) -> Value + Send + Sync>,
    /// Called for DATE values (days since the Unix epoch).
    pub date_from_days: Box<dyn Fn(i32) -> Value + Send + Sync>,
    /// Called for string values.
    pub string_from_bytes: Box<dyn Fn(&[u8]) -> Value + Send + Sync>,
}

impl Default for Parsers {
    fn default() -> Self {
        Self {
            timestamp_from_milliseconds: Box::new(|v| {
                DateTime::from_timestamp_millis(v)
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null)
            }),
            timestamp_from_microseconds: Box::new(|v| {
                DateTime::from_timestamp_micros(v)
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null)
            }),
            timestamp_from_nanoseconds: Box::new(|v| {
                Value::Timestamp(DateTime::from_timestamp_nanos(v))
            }),
            date_from_days: Box::new(|days| {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
                let date = if days >= 0 {
                    epoch.checked_add_days(Days::new(days as u64))
                } else {
                    epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
                };
                date.map(Value::Date).unwrap_or(Value::Null)
            }),
            string_from_bytes: Box::new(|bytes| Value::Text(Arc::from(String::from_utf8_lossy(bytes)))),
        }
    }
}

impl std::fmt::Debug for Parsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Parsers")
    }
}

/// Dereferences dictionary indices, then converts to logical values.
///
/// The dictionary is already converted, so a gather is all that remains for
/// dictionary-encoded pages.
pub fn convert_with_dictionary(
    values: Values,
    dictionary: Option<&[Value]>,
    element: &SchemaElement,
    encoding: Encoding,
    parsers: &Parsers,
    utf8: bool,
) -> Result<Vec<Value>> {
    match (values, dictionary) {
        (Values::Indices(indices), Some(dictionary))
            if matches!(encoding, Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY) =>
        {
            indices
                .into_iter()
                .map(|i| {
                    dictionary
                        .get(i as usize)
                        .cloned()
                        .ok_or_else(|| general_err!("Dictionary index {} out of bounds", i))
                })
                .collect()
        }
        (Values::Indices(_), None) => Err(general_err!(
            "Column has a dictionary-encoded page but no dictionary"
        )),
        (values, _) => convert_values(values, element, parsers, utf8),
    }
}

/// Converts decoded physical values to logical values per the element's
/// type annotations.
pub fn convert_values(
    values: Values,
    element: &SchemaElement,
    parsers: &Parsers,
    utf8: bool,
) -> Result<Vec<Value>> {
    let ctype = element.converted_type;
    let ltype = element.logical_type.as_ref();

    // unsupported converted types are rejected rather than passed through
    if let Some(ctype @ (ConvertedType::BSON | ConvertedType::INTERVAL)) = ctype {
        return Err(ParquetError::UnsupportedConverted(ctype));
    }
    if ltype == Some(&LogicalType::Bson) {
        return Err(ParquetError::UnsupportedConverted(ConvertedType::BSON));
    }

    if ctype == Some(ConvertedType::DECIMAL) || matches!(ltype, Some(LogicalType::Decimal { .. })) {
        let scale = match ltype {
            Some(LogicalType::Decimal { scale, .. }) => *scale,
            _ => element.scale.unwrap_or(0),
        };
        let factor = 10f64.powi(-scale);
        return Ok(match values {
            Values::Int32(v) => v.iter().map(|v| Value::Double(*v as f64 * factor)).collect(),
            Values::Int64(v) => v.iter().map(|v| Value::Double(*v as f64 * factor)).collect(),
            Values::Bytes(v) => v
                .iter()
                .map(|b| Value::Double(decimal_from_bytes(b) * factor))
                .collect(),
            other => return Err(unsupported_physical(&other, element)),
        });
    }

    if ctype == Some(ConvertedType::DATE) || ltype == Some(&LogicalType::Date) {
        return match values {
            Values::Int32(v) => Ok(v.iter().map(|d| (parsers.date_from_days)(*d)).collect()),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    let timestamp_unit = match (ctype, ltype) {
        (Some(ConvertedType::TIMESTAMP_MILLIS), _) => Some(TimeUnit::MILLIS),
        (Some(ConvertedType::TIMESTAMP_MICROS), _) => Some(TimeUnit::MICROS),
        (_, Some(LogicalType::Timestamp { unit, .. })) => Some(*unit),
        _ => None,
    };
    if let Some(unit) = timestamp_unit {
        let parse: &(dyn Fn(i64) -> Value + Send + Sync) = match unit {
            TimeUnit::MILLIS => &parsers.timestamp_from_milliseconds,
            TimeUnit::MICROS => &parsers.timestamp_from_microseconds,
            TimeUnit::NANOS => &parsers.timestamp_from_nanoseconds,
        };
        return match values {
            Values::Int64(v) => Ok(v.iter().map(|v| parse(*v)).collect()),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    if ctype == Some(ConvertedType::JSON) || ltype == Some(&LogicalType::Json) {
        return match values {
            Values::Bytes(v) => v.iter().map(|b| json_value(b)).collect(),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    let stringly = matches!(ctype, Some(ConvertedType::UTF8 | ConvertedType::ENUM))
        || matches!(ltype, Some(LogicalType::String | LogicalType::Enum))
        || (utf8 && element.physical_type == Some(Type::BYTE_ARRAY) && ctype.is_none() && ltype.is_none());
    if stringly {
        return match values {
            Values::Bytes(v) => Ok(v.iter().map(|b| (parsers.string_from_bytes)(b)).collect()),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    if let Some(width) = unsigned_width(ctype, ltype) {
        return Ok(match values {
            Values::Int32(v) => v
                .iter()
                .map(|v| {
                    Value::UInt(match width {
                        8 => *v as u8 as u64,
                        16 => *v as u16 as u64,
                        _ => *v as u32 as u64,
                    })
                })
                .collect(),
            Values::Int64(v) => v.iter().map(|v| Value::UInt(*v as u64)).collect(),
            other => return Err(unsupported_physical(&other, element)),
        });
    }

    if ltype == Some(&LogicalType::Float16) {
        return match values {
            Values::Bytes(v) => v
                .iter()
                .map(|b| {
                    let bytes: [u8; 2] = b
                        .as_ref()
                        .try_into()
                        .map_err(|_| general_err!("FLOAT16 value is not 2 bytes"))?;
                    Ok(Value::Float(half::f16::from_le_bytes(bytes).to_f32()))
                })
                .collect(),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    if ltype == Some(&LogicalType::Uuid) {
        return match values {
            Values::Bytes(v) => v.iter().map(|b| uuid_value(b)).collect(),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    if matches!(ltype, Some(LogicalType::Geometry | LogicalType::Geography)) {
        return match values {
            Values::Bytes(v) => v.iter().map(|b| decode_wkb(b)).collect(),
            other => Err(unsupported_physical(&other, element)),
        };
    }

    // no annotation: surface the physical values
    Ok(match values {
        Values::Bool(v) => v.into_iter().map(Value::Bool).collect(),
        Values::Int32(v) => v.into_iter().map(|v| Value::Int(v as i64)).collect(),
        Values::Int64(v) => v.into_iter().map(Value::Int).collect(),
        Values::Int96(v) => v
            .into_iter()
            .map(|v| (parsers.timestamp_from_nanoseconds)(v.to_nanos()))
            .collect(),
        Values::Float(v) => v.into_iter().map(Value::Float).collect(),
        Values::Double(v) => v.into_iter().map(Value::Double).collect(),
        Values::Bytes(v) => v.into_iter().map(Value::Bytes).collect(),
        Values::Indices(_) => {
            return Err(general_err!(
                "Dictionary indices cannot be converted without a dictionary"
            ))
        }
    })
}

fn unsupported_physical(values: &Values, element: &SchemaElement) -> ParquetError {
    general_err!(
        "Column {} has an annotation incompatible with its physical values: {:?}",
        element.name,
        std::mem::discriminant(values)
    )
}

fn unsigned_width(ctype: Option<ConvertedType>, ltype: Option<&LogicalType>) -> Option<u8> {
    match ctype {
        Some(ConvertedType::UINT_8) => return Some(8),
        Some(ConvertedType::UINT_16) => return Some(16),
        Some(ConvertedType::UINT_32) => return Some(32),
        Some(ConvertedType::UINT_64) => return Some(64),
        _ => {}
    }
    match ltype {
        Some(LogicalType::Integer {
            is_signed: false,
            bit_width,
        }) => Some(*bit_width as u8),
        _ => None,
    }
}

/// Interprets big-endian two's-complement bytes as a float.
///
/// Accumulates in f64 so arbitrary precisions decode; precision beyond 53
/// bits rounds, which is inherent to the f64 output type.
fn decimal_from_bytes(bytes: &[u8]) -> f64 {
    let mut value = 0f64;
    for byte in bytes {
        value = value * 256.0 + *byte as f64;
    }
    if let Some(first) = bytes.first() {
        if first & 0x80 != 0 {
            value -= 256f64.powi(bytes.len() as i32);
        }
    }
    value
}

fn json_value(bytes: &Bytes) -> Result<Value> {
    let parsed: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| general_err!("invalid JSON value: {}", e))?;
    Ok(from_json(parsed))
}

fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(v) => Value::Bool(v),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Int(v)
            } else if let Some(v) = n.as_u64() {
                Value::UInt(v)
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(Arc::from(s.as_str())),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (Arc::from(k.as_str()), from_json(v)))
                .collect(),
        ),
    }
}

fn uuid_value(bytes: &Bytes) -> Result<Value> {
    let b: &[u8; 16] = bytes
        .as_ref()
        .try_into()
        .map_err(|_| general_err!("UUID value is not 16 bytes"))?;
    let hex: Vec<String> = b.iter().map(|byte| format!("{byte:02x}")).collect();
    let hex = hex.concat();
    Ok(Value::text(format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )))
}
