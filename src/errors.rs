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

//! Common decoder errors and macros.

use std::error::Error;
use std::{io, result, str};

use crate::basic::{Compression, ConvertedType, Encoding, Type};

/// Decoder error enumeration
// Note: no PartialEq as the semantics for the Source variant are not
// well defined
#[derive(Debug)]
pub enum ParquetError {
    /// File is too short to hold the 8-byte footer.
    ShortFile,
    /// The trailing magic bytes are not `PAR1`.
    BadMagic,
    /// The footer-reported metadata length does not fit in the file.
    BadMetadataLength {
        /// Metadata length read from the footer
        metadata_len: u64,
        /// Total file length
        file_len: u64,
    },
    /// Malformed Thrift compact protocol data: unknown type, field type
    /// mismatch, or truncated input.
    Thrift(String),
    /// The page uses an encoding this decoder does not implement.
    UnsupportedEncoding(Encoding),
    /// The column uses a compression codec that is neither built in nor
    /// supplied by the caller.
    UnsupportedCodec(Compression),
    /// The column uses a physical type the operation cannot handle.
    UnsupportedType(Type),
    /// The column uses a converted type with no defined conversion
    /// (BSON, INTERVAL).
    UnsupportedConverted(ConvertedType),
    /// A bit-packed run walked past the end of the page buffer.
    BitpackOutOfBounds,
    /// A DELTA_* page violated its own header (bad block size, missing
    /// miniblock widths, value overflow).
    DeltaDecode(String),
    /// Schema violation: element not found, struct length mismatch,
    /// list/map shape error.
    Schema(String),
    /// A column chunk references data in another file via `file_path`.
    ExternalFile(String),
    /// A single compressed column chunk exceeds the configured limit.
    /// Reported as a warning by the orchestrator; the column is skipped.
    ColumnTooLarge {
        /// Dotted column path
        column: String,
        /// Compressed size in bytes
        size: u64,
    },
    /// The planner and prefetch buffer disagree about a byte range.
    /// Always an internal bug.
    PrefetchMiss {
        /// Start of the requested range
        start: u64,
        /// End (exclusive) of the requested range
        end: u64,
    },
    /// Error from the underlying byte source.
    Source(Box<dyn Error + Send + Sync>),
    /// "End of data" error: not enough bytes to decode.
    EOF(String),
    /// General decoding error returned when nothing more specific fits.
    General(String),
}

impl std::fmt::Display for ParquetError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            ParquetError::ShortFile => {
                write!(fmt, "Invalid Parquet file. Size is smaller than footer")
            }
            ParquetError::BadMagic => write!(fmt, "Invalid Parquet file. Corrupt footer"),
            ParquetError::BadMetadataLength {
                metadata_len,
                file_len,
            } => write!(
                fmt,
                "Invalid Parquet file. Reported metadata length of {metadata_len} + 8 byte footer, but file is only {file_len} bytes"
            ),
            ParquetError::Thrift(message) => write!(fmt, "Thrift error: {message}"),
            ParquetError::UnsupportedEncoding(encoding) => {
                write!(fmt, "Unsupported encoding: {encoding}")
            }
            ParquetError::UnsupportedCodec(codec) => {
                write!(fmt, "Unsupported compression codec: {codec}")
            }
            ParquetError::UnsupportedType(t) => write!(fmt, "Unsupported physical type: {t}"),
            ParquetError::UnsupportedConverted(ctype) => {
                write!(fmt, "Unsupported converted type: {ctype}")
            }
            ParquetError::BitpackOutOfBounds => {
                write!(fmt, "Bit-packed run reads past end of buffer")
            }
            ParquetError::DeltaDecode(message) => write!(fmt, "Delta decode error: {message}"),
            ParquetError::Schema(message) => write!(fmt, "Schema error: {message}"),
            ParquetError::ExternalFile(path) => {
                write!(fmt, "Column chunk references external file: {path}")
            }
            ParquetError::ColumnTooLarge { column, size } => {
                write!(fmt, "Column {column} is too large: {size} bytes")
            }
            ParquetError::PrefetchMiss { start, end } => {
                write!(fmt, "No prefetch covers byte range [{start}, {end})")
            }
            ParquetError::Source(e) => write!(fmt, "Source error: {e}"),
            ParquetError::EOF(message) => write!(fmt, "EOF: {message}"),
            ParquetError::General(message) => write!(fmt, "Parquet error: {message}"),
        }
    }
}

impl Error for ParquetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParquetError::Source(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for ParquetError {
    fn from(e: io::Error) -> ParquetError {
        ParquetError::Source(Box::new(e))
    }
}

impl From<str::Utf8Error> for ParquetError {
    fn from(e: str::Utf8Error) -> ParquetError {
        ParquetError::Thrift(format!("invalid utf8: {e}"))
    }
}

/// A specialized `Result` for decoder errors.
pub type Result<T, E = ParquetError> = result::Result<T, E>;

// ----------------------------------------------------------------------
// Convenient macros for different errors

macro_rules! general_err {
    ($fmt:expr) => (ParquetError::General($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (ParquetError::General(format!($fmt, $($args),*)));
}

macro_rules! eof_err {
    ($fmt:expr) => (ParquetError::EOF($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (ParquetError::EOF(format!($fmt, $($args),*)));
}

macro_rules! thrift_err {
    ($fmt:expr) => (ParquetError::Thrift($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (ParquetError::Thrift(format!($fmt, $($args),*)));
}

macro_rules! schema_err {
    ($fmt:expr) => (ParquetError::Schema($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (ParquetError::Schema(format!($fmt, $($args),*)));
}
