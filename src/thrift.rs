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

//! Decoder for the Thrift [compact protocol].
//!
//! Parquet metadata and page headers are Thrift structs. This module decodes
//! them into [`ThriftStruct`]: a sparse, positional sequence indexed by field
//! id, which preserves forward compatibility with fields this crate does not
//! know about. Callers read fields back out with the typed accessors.
//!
//! [compact protocol]: https://github.com/apache/thrift/blob/master/doc/specs/thrift-compact-protocol.md

use crate::errors::{ParquetError, Result};

/// Nested structs deeper than this are rejected rather than recursed into.
const MAX_DEPTH: u8 = 64;

/// Field ids above this are assumed to be corruption; the Parquet format
/// never exceeds two digits.
const MAX_FIELD_ID: i16 = 1000;

// Thrift compact protocol types for struct fields and list elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CompactType {
    Stop = 0,
    BooleanTrue = 1,
    BooleanFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
}

impl TryFrom<u8> for CompactType {
    type Error = ParquetError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Stop),
            1 => Ok(Self::BooleanTrue),
            2 => Ok(Self::BooleanFalse),
            3 => Ok(Self::Byte),
            4 => Ok(Self::I16),
            5 => Ok(Self::I32),
            6 => Ok(Self::I64),
            7 => Ok(Self::Double),
            8 => Ok(Self::Binary),
            9 => Ok(Self::List),
            10 => Ok(Self::Set),
            11 => Ok(Self::Map),
            12 => Ok(Self::Struct),
            _ => Err(thrift_err!("Unexpected compact type {}", value)),
        }
    }
}

/// One decoded Thrift value.
///
/// A closed sum over the compact protocol types the Parquet format uses.
/// Binary data borrows from the input buffer; nothing is copied until a
/// caller asks for an owned form.
#[derive(Clone, Debug, PartialEq)]
pub enum ThriftValue<'a> {
    /// A boolean, either a field-header boolean or a list element.
    Bool(bool),
    /// A single byte.
    Byte(i8),
    /// A zigzag varint decoded as `i32` (compact types I16 and I32).
    I32(i32),
    /// A zigzag varint decoded as `i64`.
    I64(i64),
    /// An 8-byte little-endian IEEE-754 double.
    Double(f64),
    /// A length-prefixed run of raw bytes.
    Binary(&'a [u8]),
    /// A homogeneous list.
    List(Vec<ThriftValue<'a>>),
    /// A nested struct.
    Struct(ThriftStruct<'a>),
}

/// A decoded Thrift struct: field values stored positionally by field id.
///
/// Slot `i` holds the value of field id `i`; absent fields are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThriftStruct<'a> {
    fields: Vec<Option<ThriftValue<'a>>>,
}

impl<'a> ThriftStruct<'a> {
    /// Returns the raw value of field `id`, if present.
    pub fn get(&self, id: i16) -> Option<&ThriftValue<'a>> {
        self.fields.get(id as usize).and_then(|f| f.as_ref())
    }

    fn set(&mut self, id: i16, value: ThriftValue<'a>) {
        let idx = id as usize;
        if self.fields.len() <= idx {
            self.fields.resize(idx + 1, None);
        }
        self.fields[idx] = Some(value);
    }

    /// Returns field `id` as a bool.
    pub fn get_bool(&self, id: i16) -> Result<Option<bool>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(id, "bool", other)),
        }
    }

    /// Returns field `id` as an i8.
    pub fn get_i8(&self, id: i16) -> Result<Option<i8>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::Byte(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(id, "byte", other)),
        }
    }

    /// Returns field `id` as an i32.
    pub fn get_i32(&self, id: i16) -> Result<Option<i32>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::I32(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(id, "i32", other)),
        }
    }

    /// Returns field `id` as an i64, widening an on-wire i32 if needed.
    pub fn get_i64(&self, id: i16) -> Result<Option<i64>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::I64(v)) => Ok(Some(*v)),
            Some(ThriftValue::I32(v)) => Ok(Some(*v as i64)),
            Some(other) => Err(mismatch(id, "i64", other)),
        }
    }

    /// Returns field `id` as raw bytes.
    pub fn get_binary(&self, id: i16) -> Result<Option<&'a [u8]>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::Binary(v)) => Ok(Some(v)),
            Some(other) => Err(mismatch(id, "binary", other)),
        }
    }

    /// Returns field `id` as a UTF-8 string.
    pub fn get_str(&self, id: i16) -> Result<Option<&'a str>> {
        match self.get_binary(id)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(std::str::from_utf8(bytes)?)),
        }
    }

    /// Returns field `id` as a list of values.
    pub fn get_list(&self, id: i16) -> Result<Option<&[ThriftValue<'a>]>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::List(v)) => Ok(Some(v)),
            Some(other) => Err(mismatch(id, "list", other)),
        }
    }

    /// Returns field `id` as a nested struct.
    pub fn get_struct(&self, id: i16) -> Result<Option<&ThriftStruct<'a>>> {
        match self.get(id) {
            None => Ok(None),
            Some(ThriftValue::Struct(v)) => Ok(Some(v)),
            Some(other) => Err(mismatch(id, "struct", other)),
        }
    }

    /// Returns required field `id` as an i32.
    pub fn required_i32(&self, id: i16, what: &str) -> Result<i32> {
        self.get_i32(id)?
            .ok_or_else(|| thrift_err!("Required field {} (id {}) is missing", what, id))
    }

    /// Returns required field `id` as an i64.
    pub fn required_i64(&self, id: i16, what: &str) -> Result<i64> {
        self.get_i64(id)?
            .ok_or_else(|| thrift_err!("Required field {} (id {}) is missing", what, id))
    }

    /// Returns required field `id` as a list.
    pub fn required_list(&self, id: i16, what: &str) -> Result<&[ThriftValue<'a>]> {
        self.get_list(id)?
            .ok_or_else(|| thrift_err!("Required field {} (id {}) is missing", what, id))
    }

    /// The field id of the single populated slot, for decoding unions.
    pub fn union_variant(&self) -> Result<(i16, &ThriftValue<'a>)> {
        let mut found = None;
        for (id, slot) in self.fields.iter().enumerate() {
            if let Some(value) = slot {
                if found.is_some() {
                    return Err(thrift_err!("Union has more than one field set"));
                }
                found = Some((id as i16, value));
            }
        }
        found.ok_or_else(|| thrift_err!("Union has no field set"))
    }
}

fn mismatch(id: i16, expected: &str, got: &ThriftValue<'_>) -> ParquetError {
    let got = match got {
        ThriftValue::Bool(_) => "bool",
        ThriftValue::Byte(_) => "byte",
        ThriftValue::I32(_) => "i32",
        ThriftValue::I64(_) => "i64",
        ThriftValue::Double(_) => "double",
        ThriftValue::Binary(_) => "binary",
        ThriftValue::List(_) => "list",
        ThriftValue::Struct(_) => "struct",
    };
    thrift_err!("Field {} has type {}, expected {}", id, got, expected)
}

/// Header of one field in a Thrift struct.
pub(crate) struct FieldHeader {
    pub(crate) field_type: CompactType,
    pub(crate) id: i16,
    /// Booleans carry their value in the type nibble and store no data.
    pub(crate) bool_val: Option<bool>,
}

/// A cursor decoding the Thrift compact protocol from a byte slice.
pub struct ThriftCompactReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> ThriftCompactReader<'a> {
    /// Create a new reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.total - self.buf.len()
    }

    /// The unread remainder of the input.
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let ret = *self
            .buf
            .first()
            .ok_or_else(|| thrift_err!("Unexpected end of input"))?;
        self.buf = &self.buf[1..];
        Ok(ret)
    }

    pub(crate) fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_vlq()? as usize;
        let ret = self
            .buf
            .get(..len)
            .ok_or_else(|| thrift_err!("Unexpected end of input"))?;
        self.buf = &self.buf[len..];
        Ok(ret)
    }

    fn read_double(&mut self) -> Result<f64> {
        let slice = self
            .buf
            .get(..8)
            .ok_or_else(|| thrift_err!("Unexpected end of input"))?;
        self.buf = &self.buf[8..];
        Ok(f64::from_le_bytes(slice.try_into().unwrap()))
    }

    /// Read a ULEB128 encoded unsigned varint.
    pub fn read_vlq(&mut self) -> Result<u64> {
        // the single byte case is the common one
        let byte = self.read_byte()?;
        if byte & 0x80 == 0 {
            return Ok(byte as u64);
        }
        let mut in_progress = (byte & 0x7f) as u64;
        let mut shift = 7;
        loop {
            let byte = self.read_byte()?;
            in_progress |= ((byte & 0x7f) as u64).wrapping_shl(shift);
            if byte & 0x80 == 0 {
                return Ok(in_progress);
            }
            shift += 7;
            if shift > 63 {
                return Err(thrift_err!("Varint is too long"));
            }
        }
    }

    /// Read a zigzag encoded signed varint.
    pub fn read_zig_zag(&mut self) -> Result<i64> {
        let val = self.read_vlq()?;
        Ok((val >> 1) as i64 ^ -((val & 1) as i64))
    }

    /// Read a zigzag encoded signed varint as i32.
    pub fn read_zig_zag_i32(&mut self) -> Result<i32> {
        Ok(self.read_zig_zag()? as i32)
    }

    pub(crate) fn read_field_begin(&mut self, last_field_id: i16) -> Result<FieldHeader> {
        let header = self.read_byte()?;
        let field_delta = (header & 0xf0) >> 4;
        let field_type = CompactType::try_from(header & 0x0f)?;

        if field_type == CompactType::Stop {
            return Ok(FieldHeader {
                field_type,
                id: 0,
                bool_val: None,
            });
        }

        let bool_val = match field_type {
            CompactType::BooleanTrue => Some(true),
            CompactType::BooleanFalse => Some(false),
            _ => None,
        };

        let id = if field_delta != 0 {
            last_field_id
                .checked_add(field_delta as i16)
                .ok_or_else(|| thrift_err!("Field id delta overflows"))?
        } else {
            self.read_zig_zag()? as i16
        };
        if !(0..=MAX_FIELD_ID).contains(&id) {
            return Err(thrift_err!("Field id {} out of range", id));
        }

        Ok(FieldHeader {
            field_type,
            id,
            bool_val,
        })
    }

    pub(crate) fn read_list_begin(&mut self) -> Result<(CompactType, usize)> {
        let header = self.read_byte()?;
        // some writers emit an element type of 0 for an empty list
        if header == 0 {
            return Ok((CompactType::Byte, 0));
        }
        let element_type = CompactType::try_from(header & 0x0f)?;
        let size = match (header & 0xf0) >> 4 {
            // count and type encoded separately
            15 => self.read_vlq()? as usize,
            n => n as usize,
        };
        Ok((element_type, size))
    }

    /// Read a boolean list element.
    ///
    /// The original thrift specification used 0/1 inside collections but many
    /// implementations write 1/2 as in field headers; accept both.
    fn read_bool_element(&mut self) -> Result<bool> {
        match self.read_byte()? {
            0x01 => Ok(true),
            0x00 | 0x02 => Ok(false),
            b => Err(thrift_err!("Cannot convert {} into bool", b)),
        }
    }

    /// Decode a whole struct into its positional field array.
    pub fn read_struct(&mut self) -> Result<ThriftStruct<'a>> {
        self.read_struct_at(0)
    }

    fn read_struct_at(&mut self, depth: u8) -> Result<ThriftStruct<'a>> {
        if depth >= MAX_DEPTH {
            return Err(thrift_err!("Struct nesting exceeds depth limit"));
        }
        let mut result = ThriftStruct::default();
        let mut last_field_id = 0i16;
        loop {
            let header = self.read_field_begin(last_field_id)?;
            if header.field_type == CompactType::Stop {
                return Ok(result);
            }
            let value = match header.bool_val {
                Some(v) => ThriftValue::Bool(v),
                None => self.read_element(header.field_type, depth)?,
            };
            result.set(header.id, value);
            last_field_id = header.id;
        }
    }

    fn read_element(&mut self, element_type: CompactType, depth: u8) -> Result<ThriftValue<'a>> {
        Ok(match element_type {
            CompactType::BooleanTrue | CompactType::BooleanFalse => {
                ThriftValue::Bool(self.read_bool_element()?)
            }
            CompactType::Byte => ThriftValue::Byte(self.read_byte()? as i8),
            CompactType::I16 | CompactType::I32 => ThriftValue::I32(self.read_zig_zag_i32()?),
            CompactType::I64 => ThriftValue::I64(self.read_zig_zag()?),
            CompactType::Double => ThriftValue::Double(self.read_double()?),
            CompactType::Binary => ThriftValue::Binary(self.read_bytes()?),
            CompactType::List => {
                let (element_type, size) = self.read_list_begin()?;
                let mut elements = Vec::with_capacity(size.min(1024));
                for _ in 0..size {
                    elements.push(self.read_element(element_type, depth)?);
                }
                ThriftValue::List(elements)
            }
            CompactType::Struct => ThriftValue::Struct(self.read_struct_at(depth + 1)?),
            // not used by the parquet format
            CompactType::Set | CompactType::Map | CompactType::Stop => {
                return Err(thrift_err!("Cannot decode compact type {:?}", element_type))
            }
        })
    }
}
