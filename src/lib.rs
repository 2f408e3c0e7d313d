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

//! A pure, asynchronous, read-only decoder for [Apache Parquet] files.
//!
//! This crate turns random-access byte ranges of a Parquet file into typed,
//! native Rust values. It parses the Thrift-encoded footer, walks the schema
//! tree, plans the byte ranges a query needs, decompresses and decodes v1 and
//! v2 data pages, and reassembles Dremel-shredded lists, maps and structs into
//! rows.
//!
//! The crate deliberately does *not* write Parquet, evaluate predicates
//! against page indexes or bloom filters, or decrypt encrypted columns.
//!
//! # Reading a file
//!
//! Any random-access byte container can serve as input by implementing
//! [`ByteSource`]; an implementation for in-memory [`Bytes`] is provided.
//!
//! ```no_run
//! # use parquet_decode::{read_objects, ReadOptions};
//! # use bytes::Bytes;
//! # async fn example(data: Bytes) -> parquet_decode::Result<()> {
//! let rows = read_objects(ReadOptions::new(data)).await?;
//! for row in rows {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Column projection, row ranges, custom decompressors and custom temporal
//! parsers are configured through [`ReadOptions`]. Streaming consumers can
//! register [`ReadOptions::on_chunk`] / [`ReadOptions::on_page`] callbacks
//! instead of buffering all rows.
//!
//! [Apache Parquet]: https://parquet.apache.org/
//! [`Bytes`]: bytes::Bytes
//! [`ByteSource`]: crate::source::ByteSource

#[macro_use]
pub mod errors;
pub mod basic;
pub mod thrift;

mod util;

pub mod column;
pub mod compression;
pub mod convert;
pub mod data_type;
pub mod encodings;
pub mod file;
pub mod plan;
pub mod read;
pub mod record;
pub mod schema;
pub mod source;
pub mod wkb;

pub use data_type::Value;
pub use errors::{ParquetError, Result};
pub use file::footer::read_metadata;
pub use read::{read, read_arrays, read_objects, ChunkEvent, ReadOptions, RowFormat};
pub use source::ByteSource;
