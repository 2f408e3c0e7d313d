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

//! Parquet metadata structures and their mapping from the Thrift footer.
//!
//! Every struct here is populated positionally by Thrift field id from the
//! [`ThriftStruct`] intermediate, so unknown fields written by newer
//! producers are ignored rather than rejected.

use std::sync::Arc;

use crate::basic::{Compression, LogicalType, Repetition, TimeUnit, Type};
use crate::errors::{ParquetError, Result};
use crate::schema::types::{SchemaElement, SchemaTree};
use crate::thrift::{ThriftStruct, ThriftValue};

/// Decoded file metadata: everything the footer knows about the file.
///
/// Created once when a file is opened and read-only afterwards, so it can be
/// shared freely between concurrent reads of the same file.
#[derive(Clone, Debug)]
pub struct FileMetaData {
    /// Format version written by the producer.
    pub version: i32,
    /// The flat, depth-first schema element list.
    pub schema: Vec<Arc<SchemaElement>>,
    /// Total number of rows in the file.
    pub num_rows: i64,
    /// Row group metadata in file order.
    pub row_groups: Vec<RowGroupMetaData>,
    /// Optional key/value metadata pairs.
    pub key_value_metadata: Option<Vec<KeyValue>>,
    /// Writer identification string.
    pub created_by: Option<String>,
    /// Length in bytes of the Thrift-encoded footer metadata.
    pub metadata_length: u64,
    schema_tree: Arc<SchemaTree>,
}

impl FileMetaData {
    /// Creates file metadata from its parts, building the schema tree.
    pub fn new(
        version: i32,
        schema: Vec<Arc<SchemaElement>>,
        num_rows: i64,
        row_groups: Vec<RowGroupMetaData>,
        key_value_metadata: Option<Vec<KeyValue>>,
        created_by: Option<String>,
        metadata_length: u64,
    ) -> Result<Self> {
        let schema_tree = Arc::new(SchemaTree::new(&schema)?);
        Ok(Self {
            version,
            schema,
            num_rows,
            row_groups,
            key_value_metadata,
            created_by,
            metadata_length,
            schema_tree,
        })
    }

    /// The schema tree built from [`Self::schema`].
    pub fn schema_tree(&self) -> &Arc<SchemaTree> {
        &self.schema_tree
    }
}

/// A key/value metadata pair from the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    /// The key.
    pub key: String,
    /// The value, which the format allows to be absent.
    pub value: Option<String>,
}

/// Metadata for one horizontal partition of the table.
#[derive(Clone, Debug)]
pub struct RowGroupMetaData {
    /// One chunk per leaf column, in schema order.
    pub columns: Vec<ColumnChunkMetaData>,
    /// Total uncompressed size of all column data.
    pub total_byte_size: i64,
    /// Number of rows in this group.
    pub num_rows: i64,
    /// Byte offset of the first page of the first column.
    pub file_offset: Option<i64>,
    /// Total compressed size of all column data.
    pub total_compressed_size: Option<i64>,
}

/// Metadata for one column chunk within a row group.
#[derive(Clone, Debug)]
pub struct ColumnChunkMetaData {
    /// Path to an external data file. Unsupported; reads reject chunks that
    /// set this.
    pub file_path: Option<String>,
    /// Deprecated offset of this chunk's metadata within the data file.
    pub file_offset: i64,
    /// The column metadata proper; always inlined by practical writers.
    pub meta_data: Option<ColumnMetaData>,
    /// Location of the offset index, if written.
    pub offset_index_offset: Option<i64>,
    /// Length of the offset index, if written.
    pub offset_index_length: Option<i32>,
    /// Location of the column index, if written.
    pub column_index_offset: Option<i64>,
    /// Length of the column index, if written.
    pub column_index_length: Option<i32>,
}

/// Decoded `ColumnMetaData`.
#[derive(Clone, Debug)]
pub struct ColumnMetaData {
    /// Physical type of this column.
    pub physical_type: Type,
    /// Path of schema element names from (below) the root to the leaf.
    pub path_in_schema: Vec<String>,
    /// Compression codec for this chunk's pages.
    pub codec: Compression,
    /// Number of values, including nulls, in this chunk.
    pub num_values: i64,
    /// Uncompressed size of all pages, headers included.
    pub total_uncompressed_size: i64,
    /// Compressed size of all pages, headers included.
    pub total_compressed_size: i64,
    /// Byte offset of the first data page.
    pub data_page_offset: i64,
    /// Byte offset of the index page, if any.
    pub index_page_offset: Option<i64>,
    /// Byte offset of the dictionary page, if any.
    pub dictionary_page_offset: Option<i64>,
}

impl ColumnMetaData {
    /// Byte offset where this chunk's pages start: the dictionary page when
    /// present, the first data page otherwise.
    pub fn start_offset(&self) -> i64 {
        self.dictionary_page_offset.unwrap_or(self.data_page_offset)
    }

    /// Byte offset one past the last page of this chunk.
    /// `total_compressed_size` covers the dictionary page when there is one.
    pub fn end_offset(&self) -> i64 {
        self.start_offset() + self.total_compressed_size
    }

    /// The dotted column name, e.g. `b.c`.
    pub fn column_path(&self) -> String {
        self.path_in_schema.join(".")
    }
}

/// Builds [`FileMetaData`] from the decoded Thrift footer struct.
pub(crate) fn parse_file_metadata(
    s: &ThriftStruct<'_>,
    metadata_length: u64,
) -> Result<FileMetaData> {
    let version = s.required_i32(1, "version")?;
    let schema = s
        .required_list(2, "schema")?
        .iter()
        .map(parse_schema_element)
        .collect::<Result<Vec<_>>>()?;
    let num_rows = s.required_i64(3, "num_rows")?;
    let row_groups = s
        .required_list(4, "row_groups")?
        .iter()
        .map(parse_row_group)
        .collect::<Result<Vec<_>>>()?;
    let key_value_metadata = match s.get_list(5)? {
        None => None,
        Some(items) => Some(
            items
                .iter()
                .map(parse_key_value)
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    let created_by = s.get_str(6)?.map(str::to_owned);

    FileMetaData::new(
        version,
        schema,
        num_rows,
        row_groups,
        key_value_metadata,
        created_by,
        metadata_length,
    )
}

fn expect_struct<'a, 'v>(value: &'v ThriftValue<'a>, what: &str) -> Result<&'v ThriftStruct<'a>> {
    match value {
        ThriftValue::Struct(s) => Ok(s),
        _ => Err(thrift_err!("Expected {} to be a struct", what)),
    }
}

fn expect_string(value: &ThriftValue<'_>, what: &str) -> Result<String> {
    match value {
        ThriftValue::Binary(b) => Ok(std::str::from_utf8(b)?.to_owned()),
        _ => Err(thrift_err!("Expected {} to be a string", what)),
    }
}

fn parse_key_value(value: &ThriftValue<'_>) -> Result<KeyValue> {
    let s = expect_struct(value, "KeyValue")?;
    Ok(KeyValue {
        key: s
            .get_str(1)?
            .ok_or_else(|| thrift_err!("Required field key is missing"))?
            .to_owned(),
        value: s.get_str(2)?.map(str::to_owned),
    })
}

fn parse_schema_element(value: &ThriftValue<'_>) -> Result<Arc<SchemaElement>> {
    let s = expect_struct(value, "SchemaElement")?;
    Ok(Arc::new(SchemaElement {
        physical_type: s.get_i32(1)?.map(Type::try_from).transpose()?,
        type_length: s.get_i32(2)?,
        repetition: s.get_i32(3)?.map(Repetition::try_from).transpose()?,
        name: s
            .get_str(4)?
            .ok_or_else(|| thrift_err!("Required field name is missing"))?
            .to_owned(),
        num_children: s.get_i32(5)?,
        converted_type: s.get_i32(6)?.map(TryInto::try_into).transpose()?,
        scale: s.get_i32(7)?,
        precision: s.get_i32(8)?,
        field_id: s.get_i32(9)?,
        logical_type: s.get_struct(10)?.map(parse_logical_type).transpose()?,
    }))
}

/// Decodes the `LogicalType` Thrift union: exactly one field is set and the
/// field id selects the variant.
pub(crate) fn parse_logical_type(s: &ThriftStruct<'_>) -> Result<LogicalType> {
    let (id, value) = s.union_variant()?;
    Ok(match id {
        1 => LogicalType::String,
        2 => LogicalType::Map,
        3 => LogicalType::List,
        4 => LogicalType::Enum,
        5 => {
            let v = expect_struct(value, "DecimalType")?;
            LogicalType::Decimal {
                scale: v.required_i32(1, "scale")?,
                precision: v.required_i32(2, "precision")?,
            }
        }
        6 => LogicalType::Date,
        7 => {
            let v = expect_struct(value, "TimeType")?;
            LogicalType::Time {
                is_adjusted_to_utc: v.get_bool(1)?.unwrap_or(false),
                unit: parse_time_unit(v)?,
            }
        }
        8 => {
            let v = expect_struct(value, "TimestampType")?;
            LogicalType::Timestamp {
                is_adjusted_to_utc: v.get_bool(1)?.unwrap_or(false),
                unit: parse_time_unit(v)?,
            }
        }
        10 => {
            let v = expect_struct(value, "IntType")?;
            LogicalType::Integer {
                bit_width: v
                    .get_i8(1)?
                    .ok_or_else(|| thrift_err!("Required field bit_width is missing"))?,
                is_signed: v.get_bool(2)?.unwrap_or(true),
            }
        }
        11 => LogicalType::Null,
        12 => LogicalType::Json,
        13 => LogicalType::Bson,
        14 => LogicalType::Uuid,
        15 => LogicalType::Float16,
        16 => LogicalType::Variant,
        17 => LogicalType::Geometry,
        18 => LogicalType::Geography,
        _ => return Err(thrift_err!("Unknown LogicalType union field {}", id)),
    })
}

fn parse_time_unit(s: &ThriftStruct<'_>) -> Result<TimeUnit> {
    let unit = s
        .get_struct(2)?
        .ok_or_else(|| thrift_err!("Required field unit is missing"))?;
    let (id, _) = unit.union_variant()?;
    Ok(match id {
        1 => TimeUnit::MILLIS,
        2 => TimeUnit::MICROS,
        3 => TimeUnit::NANOS,
        _ => return Err(thrift_err!("Unknown TimeUnit union field {}", id)),
    })
}

fn parse_row_group(value: &ThriftValue<'_>) -> Result<RowGroupMetaData> {
    let s = expect_struct(value, "RowGroup")?;
    Ok(RowGroupMetaData {
        columns: s
            .required_list(1, "columns")?
            .iter()
            .map(parse_column_chunk)
            .collect::<Result<Vec<_>>>()?,
        total_byte_size: s.required_i64(2, "total_byte_size")?,
        num_rows: s.required_i64(3, "num_rows")?,
        file_offset: s.get_i64(5)?,
        total_compressed_size: s.get_i64(6)?,
    })
}

fn parse_column_chunk(value: &ThriftValue<'_>) -> Result<ColumnChunkMetaData> {
    let s = expect_struct(value, "ColumnChunk")?;
    Ok(ColumnChunkMetaData {
        file_path: s.get_str(1)?.map(str::to_owned),
        file_offset: s.get_i64(2)?.unwrap_or(0),
        meta_data: s.get_struct(3)?.map(parse_column_metadata).transpose()?,
        offset_index_offset: s.get_i64(4)?,
        offset_index_length: s.get_i32(5)?,
        column_index_offset: s.get_i64(6)?,
        column_index_length: s.get_i32(7)?,
    })
}

fn parse_column_metadata(s: &ThriftStruct<'_>) -> Result<ColumnMetaData> {
    let path_in_schema = s
        .required_list(3, "path_in_schema")?
        .iter()
        .map(|v| expect_string(v, "path_in_schema element"))
        .collect::<Result<Vec<_>>>()?;

    Ok(ColumnMetaData {
        physical_type: Type::try_from(s.required_i32(1, "type")?)?,
        path_in_schema,
        codec: Compression::try_from(s.required_i32(4, "codec")?)?,
        num_values: s.required_i64(5, "num_values")?,
        total_uncompressed_size: s.required_i64(6, "total_uncompressed_size")?,
        total_compressed_size: s.required_i64(7, "total_compressed_size")?,
        data_page_offset: s.required_i64(9, "data_page_offset")?,
        index_page_offset: s.get_i64(10)?,
        dictionary_page_offset: s.get_i64(11)?,
    })
}
