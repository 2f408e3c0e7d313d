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

//! PLAIN decoding for all physical types.
//!
//! Values are encoded back to back: multi-byte values little-endian,
//! booleans bit-packed LSB first, byte arrays prefixed with a u32 length.
//! Byte array values are zero-copy slices of the page buffer.

use bytes::Bytes;

use crate::basic::Type;
use crate::data_type::{Int96, Values};
use crate::errors::{ParquetError, Result};
use crate::util::bit_util::{ceil, BitReader};

fn take<'a>(page: &'a Bytes, pos: &mut usize, n: usize) -> Result<&'a [u8]> {
    let bytes = page
        .get(*pos..*pos + n)
        .ok_or_else(|| eof_err!("Unexpected end of PLAIN data"))?;
    *pos += n;
    Ok(bytes)
}

/// Decodes `count` PLAIN values of `physical_type` from `page` at `pos`.
///
/// `type_length` is the fixed value width, required only for
/// FIXED_LEN_BYTE_ARRAY columns.
pub fn read_plain(
    page: &Bytes,
    pos: &mut usize,
    physical_type: Type,
    count: usize,
    type_length: Option<i32>,
) -> Result<Values> {
    Ok(match physical_type {
        Type::BOOLEAN => {
            let bytes = take(page, pos, ceil(count, 8))?;
            let mut reader = BitReader::new(bytes);
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                // length was checked above
                values.push(reader.get_value(1).unwrap() != 0);
            }
            Values::Bool(values)
        }
        Type::INT32 => Values::Int32(
            take(page, pos, count * 4)?
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        Type::INT64 => Values::Int64(
            take(page, pos, count * 8)?
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        Type::INT96 => Values::Int96(
            take(page, pos, count * 12)?
                .chunks_exact(12)
                .map(|c| Int96::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        Type::FLOAT => Values::Float(
            take(page, pos, count * 4)?
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        Type::DOUBLE => Values::Double(
            take(page, pos, count * 8)?
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        Type::BYTE_ARRAY => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let len = u32::from_le_bytes(take(page, pos, 4)?.try_into().unwrap()) as usize;
                if page.len() < *pos + len {
                    return Err(eof_err!("Unexpected end of PLAIN byte array"));
                }
                values.push(page.slice(*pos..*pos + len));
                *pos += len;
            }
            Values::Bytes(values)
        }
        Type::FIXED_LEN_BYTE_ARRAY => {
            let len = match type_length {
                Some(len) if len > 0 => len as usize,
                _ => {
                    return Err(schema_err!(
                        "FIXED_LEN_BYTE_ARRAY column is missing its type_length"
                    ))
                }
            };
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                if page.len() < *pos + len {
                    return Err(eof_err!("Unexpected end of PLAIN fixed byte array"));
                }
                values.push(page.slice(*pos..*pos + len));
                *pos += len;
            }
            Values::Bytes(values)
        }
    })
}
