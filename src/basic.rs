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

//! Rust mappings for the enums and unions of the Parquet Thrift definition.
//! Refer to [`parquet.thrift`](https://github.com/apache/parquet-format/blob/master/src/main/thrift/parquet.thrift)
//! to see raw definitions.

use std::fmt;

use crate::errors::{ParquetError, Result};

// ----------------------------------------------------------------------
// Mirrors thrift enum `Type`

/// Physical types supported by Parquet.
///
/// These types describe the on-disk representation only; see
/// [`ConvertedType`] and [`LogicalType`] for the semantic layer on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Type {
    /// A boolean value.
    BOOLEAN,
    /// A 32-bit signed integer.
    INT32,
    /// A 64-bit signed integer.
    INT64,
    /// A 96-bit integer, only used by legacy timestamp writers.
    INT96,
    /// A 32-bit IEEE-754 floating point value.
    FLOAT,
    /// A 64-bit IEEE-754 floating point value.
    DOUBLE,
    /// A variable-length byte sequence.
    BYTE_ARRAY,
    /// A fixed-length byte sequence; the length lives in the schema.
    FIXED_LEN_BYTE_ARRAY,
}

impl TryFrom<i32> for Type {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::BOOLEAN,
            1 => Self::INT32,
            2 => Self::INT64,
            3 => Self::INT96,
            4 => Self::FLOAT,
            5 => Self::DOUBLE,
            6 => Self::BYTE_ARRAY,
            7 => Self::FIXED_LEN_BYTE_ARRAY,
            _ => return Err(thrift_err!("Unexpected Type {}", value)),
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift enum `FieldRepetitionType`

/// Representation of field repetition in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repetition {
    /// The field is required and each record has exactly one value.
    REQUIRED,
    /// The field is optional and each record has zero or one values.
    OPTIONAL,
    /// The field is repeated and each record can contain any number of values.
    REPEATED,
}

impl TryFrom<i32> for Repetition {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::REQUIRED,
            1 => Self::OPTIONAL,
            2 => Self::REPEATED,
            _ => return Err(thrift_err!("Unexpected FieldRepetitionType {}", value)),
        })
    }
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift enum `ConvertedType`

/// Deprecated common types (converted types) layered over the physical types.
///
/// Superseded by [`LogicalType`], but still written by many producers and
/// required for format v1 forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ConvertedType {
    /// A BYTE_ARRAY containing UTF-8 encoded chars.
    UTF8,
    /// A map of key/value pairs.
    MAP,
    /// The repeated key/value group inside a MAP.
    MAP_KEY_VALUE,
    /// A list of values.
    LIST,
    /// An enumeration, stored as a binary field.
    ENUM,
    /// A decimal value scaled by `10^-scale`, stored big-endian
    /// two's-complement when the physical type is a byte array.
    DECIMAL,
    /// Days since the Unix epoch, stored as INT32.
    DATE,
    /// Milliseconds since midnight, stored as INT32.
    TIME_MILLIS,
    /// Microseconds since midnight, stored as INT64.
    TIME_MICROS,
    /// Milliseconds since the Unix epoch, stored as INT64.
    TIMESTAMP_MILLIS,
    /// Microseconds since the Unix epoch, stored as INT64.
    TIMESTAMP_MICROS,
    /// An unsigned 8-bit integer stored as INT32.
    UINT_8,
    /// An unsigned 16-bit integer stored as INT32.
    UINT_16,
    /// An unsigned 32-bit integer stored as INT32.
    UINT_32,
    /// An unsigned 64-bit integer stored as INT64.
    UINT_64,
    /// A signed 8-bit integer stored as INT32.
    INT_8,
    /// A signed 16-bit integer stored as INT32.
    INT_16,
    /// A signed 32-bit integer stored as INT32.
    INT_32,
    /// A signed 64-bit integer stored as INT64.
    INT_64,
    /// A JSON document embedded in a UTF-8 column.
    JSON,
    /// A BSON document embedded in a BINARY column. Not decoded.
    BSON,
    /// A (months, days, millis) interval stored as a 12-byte
    /// FIXED_LEN_BYTE_ARRAY. Not decoded.
    INTERVAL,
}

impl TryFrom<i32> for ConvertedType {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::UTF8,
            1 => Self::MAP,
            2 => Self::MAP_KEY_VALUE,
            3 => Self::LIST,
            4 => Self::ENUM,
            5 => Self::DECIMAL,
            6 => Self::DATE,
            7 => Self::TIME_MILLIS,
            8 => Self::TIME_MICROS,
            9 => Self::TIMESTAMP_MILLIS,
            10 => Self::TIMESTAMP_MICROS,
            11 => Self::UINT_8,
            12 => Self::UINT_16,
            13 => Self::UINT_32,
            14 => Self::UINT_64,
            15 => Self::INT_8,
            16 => Self::INT_16,
            17 => Self::INT_32,
            18 => Self::INT_64,
            19 => Self::JSON,
            20 => Self::BSON,
            21 => Self::INTERVAL,
            _ => return Err(thrift_err!("Unexpected ConvertedType {}", value)),
        })
    }
}

impl fmt::Display for ConvertedType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift union `TimeUnit`

/// Time unit for `Time` and `Timestamp` logical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// Millisecond precision.
    MILLIS,
    /// Microsecond precision.
    MICROS,
    /// Nanosecond precision.
    NANOS,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift union `LogicalType`

/// Logical types used by version 2.4.0+ of the Parquet format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
    /// A UTF-8 encoded string.
    String,
    /// A map of key-value pairs.
    Map,
    /// A list of elements.
    List,
    /// A set of predefined values.
    Enum,
    /// A decimal value with a specified scale and precision.
    Decimal {
        /// The location of the decimal point.
        scale: i32,
        /// The number of digits in the decimal.
        precision: i32,
    },
    /// A date stored as days since Unix epoch.
    Date,
    /// A time stored as [`TimeUnit`] since midnight.
    Time {
        /// Whether the time is adjusted to UTC.
        is_adjusted_to_utc: bool,
        /// The unit of time.
        unit: TimeUnit,
    },
    /// A timestamp stored as [`TimeUnit`] since Unix epoch.
    Timestamp {
        /// Whether the timestamp is adjusted to UTC.
        is_adjusted_to_utc: bool,
        /// The unit of time.
        unit: TimeUnit,
    },
    /// An integer with a specified bit width and signedness.
    Integer {
        /// The number of bits in the integer.
        bit_width: i8,
        /// Whether the integer is signed.
        is_signed: bool,
    },
    /// An always-null column.
    Null,
    /// A JSON document.
    Json,
    /// A BSON document. Not decoded.
    Bson,
    /// A 16-byte UUID.
    Uuid,
    /// A 16-bit floating point number.
    Float16,
    /// A Variant value.
    Variant,
    /// A geospatial feature in Well-Known Binary form with planar edges.
    Geometry,
    /// A geospatial feature in Well-Known Binary form with non-planar edges.
    Geography,
}

// ----------------------------------------------------------------------
// Mirrors thrift enum `Encoding`

/// Encodings supported by Parquet pages.
///
/// Not all encodings are valid for all types; the page decoder rejects
/// invalid combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Encoding {
    /// The default encoding: values laid out back to back, little-endian,
    /// booleans bit-packed LSB first.
    PLAIN,
    /// **(deprecated)** Dictionary encoding where the dictionary page itself
    /// is PLAIN encoded. Data pages carry RLE/bit-packed indices.
    PLAIN_DICTIONARY,
    /// A hybrid of run-length encoding and bit packing, used for levels and
    /// booleans.
    RLE,
    /// **(deprecated)** Bit-packed only. Never produced for data pages by
    /// modern writers; level decoding accepts it as the RLE hybrid does.
    BIT_PACKED,
    /// Delta encoding for integers, with blocks of bit-packed miniblocks.
    DELTA_BINARY_PACKED,
    /// Delta-encoded lengths followed by concatenated byte array data.
    DELTA_LENGTH_BYTE_ARRAY,
    /// Incremental (shared-prefix) encoding for byte arrays.
    DELTA_BYTE_ARRAY,
    /// Dictionary indices as an RLE/bit-packed hybrid.
    RLE_DICTIONARY,
    /// Bytes of fixed-width values transposed into per-byte streams.
    BYTE_STREAM_SPLIT,
}

impl TryFrom<i32> for Encoding {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::PLAIN,
            2 => Self::PLAIN_DICTIONARY,
            3 => Self::RLE,
            4 => Self::BIT_PACKED,
            5 => Self::DELTA_BINARY_PACKED,
            6 => Self::DELTA_LENGTH_BYTE_ARRAY,
            7 => Self::DELTA_BYTE_ARRAY,
            8 => Self::RLE_DICTIONARY,
            9 => Self::BYTE_STREAM_SPLIT,
            _ => return Err(thrift_err!("Unexpected Encoding {}", value)),
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift enum `CompressionCodec`

/// Supported block compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Compression {
    /// No compression.
    UNCOMPRESSED,
    /// [Snappy](https://github.com/google/snappy) raw block format.
    SNAPPY,
    /// [Gzip](https://www.ietf.org/rfc/rfc1952.txt).
    GZIP,
    /// LZO. No built-in decoder; callers must supply one.
    LZO,
    /// [Brotli](https://github.com/google/brotli).
    BROTLI,
    /// LZ4 with the legacy Hadoop block framing.
    LZ4,
    /// [Zstandard](https://facebook.github.io/zstd/).
    ZSTD,
    /// Raw LZ4 block format, without framing.
    LZ4_RAW,
}

impl TryFrom<i32> for Compression {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::UNCOMPRESSED,
            1 => Self::SNAPPY,
            2 => Self::GZIP,
            3 => Self::LZO,
            4 => Self::BROTLI,
            5 => Self::LZ4,
            6 => Self::ZSTD,
            7 => Self::LZ4_RAW,
            _ => return Err(thrift_err!("Unexpected CompressionCodec {}", value)),
        })
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ----------------------------------------------------------------------
// Mirrors thrift enum `PageType`

/// Types of pages found in a column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PageType {
    /// A v1 data page.
    DATA_PAGE,
    /// An index page. Skipped by this decoder.
    INDEX_PAGE,
    /// A dictionary page; at most one per column chunk, always first.
    DICTIONARY_PAGE,
    /// A v2 data page with uncompressed, length-delimited level runs.
    DATA_PAGE_V2,
}

impl TryFrom<i32> for PageType {
    type Error = ParquetError;
    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::DATA_PAGE,
            1 => Self::INDEX_PAGE,
            2 => Self::DICTIONARY_PAGE,
            3 => Self::DATA_PAGE_V2,
            _ => return Err(thrift_err!("Unexpected PageType {}", value)),
        })
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_thrift() {
        assert_eq!(Type::try_from(0).unwrap(), Type::BOOLEAN);
        assert_eq!(Type::try_from(7).unwrap(), Type::FIXED_LEN_BYTE_ARRAY);
        assert!(Type::try_from(8).is_err());
    }

    #[test]
    fn test_encoding_from_thrift() {
        assert_eq!(Encoding::try_from(0).unwrap(), Encoding::PLAIN);
        assert_eq!(Encoding::try_from(8).unwrap(), Encoding::RLE_DICTIONARY);
        assert_eq!(Encoding::try_from(9).unwrap(), Encoding::BYTE_STREAM_SPLIT);
        // 1 was never assigned
        assert!(Encoding::try_from(1).is_err());
    }

    #[test]
    fn test_compression_from_thrift() {
        assert_eq!(Compression::try_from(0).unwrap(), Compression::UNCOMPRESSED);
        assert_eq!(Compression::try_from(7).unwrap(), Compression::LZ4_RAW);
        assert!(Compression::try_from(8).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::BYTE_ARRAY.to_string(), "BYTE_ARRAY");
        assert_eq!(Compression::LZ4_RAW.to_string(), "LZ4_RAW");
        assert_eq!(Encoding::DELTA_BINARY_PACKED.to_string(), "DELTA_BINARY_PACKED");
    }
}
