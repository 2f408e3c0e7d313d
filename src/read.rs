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

//! The read orchestrator: plans the byte ranges a query needs, streams each
//! overlapping row group's columns through the page decoder, assembles
//! nested columns, and transposes columns into rows.
//!
//! Reads are plain futures; dropping one cancels the in-flight range
//! fetches and releases any partially decoded columns.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::column::reader::{read_column_chunk, ColumnChunkData, ColumnDecoder};
use crate::compression::Decompressors;
use crate::convert::Parsers;
use crate::data_type::Value;
use crate::errors::{ParquetError, Result};
use crate::file::footer::read_metadata;
use crate::file::metadata::FileMetaData;
use crate::plan::plan_read;
use crate::record::assembler::assemble_nested;
use crate::schema::types::SchemaNode;
use crate::source::{ByteSource, Prefetch};

/// A column chunk exceeding this compressed size is skipped with a warning
/// rather than decoded.
const MAX_COLUMN_BYTES: u64 = 1 << 30; // 1 GiB

/// Shape of the rows a read produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowFormat {
    /// Each row is a positional [`Value::List`] of the selected columns in
    /// schema order.
    #[default]
    Array,
    /// Each row is a [`Value::Record`] keyed by column name.
    Object,
}

/// A run of decoded rows of one column, borrowed by the streaming callbacks.
#[derive(Clone, Copy, Debug)]
pub struct ChunkEvent<'a> {
    /// Dotted path of the column.
    pub column: &'a str,
    /// Absolute row index of the first row.
    pub row_start: u64,
    /// Absolute row index one past the last row.
    pub row_end: u64,
    /// The decoded rows.
    pub rows: &'a [Value],
}

type EventFn = Box<dyn FnMut(ChunkEvent<'_>) + Send>;

/// Options for [`read`].
pub struct ReadOptions {
    source: Arc<dyn ByteSource>,
    /// Reuse previously loaded metadata instead of refetching the footer.
    pub metadata: Option<Arc<FileMetaData>>,
    /// Top-level column names to read; `None` reads everything.
    pub columns: Option<Vec<String>>,
    /// First row to return.
    pub row_start: u64,
    /// One past the last row to return; clamped to the file's row count.
    pub row_end: u64,
    /// Decode unannotated BYTE_ARRAY columns as UTF-8 strings.
    pub utf8: bool,
    /// Shape of the produced rows.
    pub row_format: RowFormat,
    /// Caller-supplied decompressors, consulted before the built-in codecs.
    pub decompressors: Decompressors,
    /// Temporal and string materialisation hooks.
    pub parsers: Arc<Parsers>,
    /// Called once per page run of each column, in increasing row order.
    pub on_page: Option<EventFn>,
    /// Called once per column chunk, columns within a group in schema order.
    pub on_chunk: Option<EventFn>,
}

impl ReadOptions {
    /// Creates options reading every row and column of `source`.
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            metadata: None,
            columns: None,
            row_start: 0,
            row_end: u64::MAX,
            utf8: true,
            row_format: RowFormat::default(),
            decompressors: Decompressors::default(),
            parsers: Arc::new(Parsers::default()),
            on_page: None,
            on_chunk: None,
        }
    }

    /// Restricts the read to the given top-level columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the read to rows `[row_start, row_end)`.
    pub fn with_row_range(mut self, row_start: u64, row_end: u64) -> Self {
        self.row_start = row_start;
        self.row_end = row_end;
        self
    }

    /// Sets the row shape.
    pub fn with_row_format(mut self, row_format: RowFormat) -> Self {
        self.row_format = row_format;
        self
    }

    /// Sets whether unannotated BYTE_ARRAY columns decode as UTF-8.
    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Supplies previously loaded metadata.
    pub fn with_metadata(mut self, metadata: Arc<FileMetaData>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Registers caller-supplied decompressors.
    pub fn with_decompressors(mut self, decompressors: Decompressors) -> Self {
        self.decompressors = decompressors;
        self
    }

    /// Replaces the temporal and string parser hooks.
    pub fn with_parsers(mut self, parsers: Arc<Parsers>) -> Self {
        self.parsers = parsers;
        self
    }

    /// Registers a per-page callback.
    pub fn on_page(mut self, f: impl FnMut(ChunkEvent<'_>) + Send + 'static) -> Self {
        self.on_page = Some(Box::new(f));
        self
    }

    /// Registers a per-chunk callback.
    pub fn on_chunk(mut self, f: impl FnMut(ChunkEvent<'_>) + Send + 'static) -> Self {
        self.on_chunk = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOptions")
            .field("columns", &self.columns)
            .field("row_start", &self.row_start)
            .field("row_end", &self.row_end)
            .field("utf8", &self.utf8)
            .field("row_format", &self.row_format)
            .finish()
    }
}

/// Reads the selected rows, returning them in ascending row order.
///
/// Completion of the returned future is the read's `on_complete`; on error
/// no rows are returned and no further callbacks fire. Partially decoded
/// row groups are never emitted.
pub async fn read(options: ReadOptions) -> Result<Vec<Value>> {
    let ReadOptions {
        source,
        metadata,
        columns,
        row_start,
        row_end,
        utf8,
        row_format,
        decompressors,
        parsers,
        mut on_page,
        mut on_chunk,
    } = options;

    let metadata = match metadata {
        Some(metadata) => metadata,
        None => Arc::new(read_metadata(&source).await?),
    };
    let schema = metadata.schema_tree().clone();

    let row_end = row_end.min(metadata.num_rows.max(0) as u64);
    if row_start >= row_end {
        return Ok(Vec::new());
    }

    let plan = plan_read(&metadata, row_start, row_end)?;
    let prefetch = Prefetch::new(source, &plan.fetches);

    let requested = |name: &str| -> bool {
        columns
            .as_ref()
            .map(|cols| cols.iter().any(|c| c == name))
            .unwrap_or(true)
    };

    let mut rows = Vec::new();
    for group in &plan.groups {
        let row_group = &metadata.row_groups[group.row_group];

        // launch one task per selected column; fetches resolve in any order
        // through the shared prefetch, results are consumed in column order
        let mut tasks = Vec::new();
        for (index, column) in row_group.columns.iter().enumerate() {
            let meta = column
                .meta_data
                .as_ref()
                .ok_or_else(|| general_err!("Column chunk is missing metadata"))?;
            let top_level = meta
                .path_in_schema
                .first()
                .ok_or_else(|| schema_err!("Column chunk has an empty schema path"))?;
            if !requested(top_level) {
                continue;
            }
            if meta.total_compressed_size.max(0) as u64 > MAX_COLUMN_BYTES {
                log::warn!(
                    "skipping column {}: compressed size {} exceeds {} bytes",
                    meta.column_path(),
                    meta.total_compressed_size,
                    MAX_COLUMN_BYTES
                );
                continue;
            }
            let range = group.ranges[index];
            let prefetch = &prefetch;
            let schema = &schema;
            let decompressors = &decompressors;
            let parsers = &parsers;
            tasks.push(async move {
                let chunk = prefetch.slice(range.start, range.end).await?;
                let mut decoder = ColumnDecoder::new(meta, schema, decompressors, utf8)?;
                read_column_chunk(
                    &chunk,
                    &mut decoder,
                    parsers,
                    group.group_start,
                    group.select_start,
                    group.select_end,
                )
            });
        }
        let columns_data: Vec<Vec<ColumnChunkData>> = try_join_all(tasks).await?;

        // streaming callbacks fire in column order, pages in row order
        for column_chunks in &columns_data {
            for chunk in column_chunks {
                if let Some(f) = on_page.as_mut() {
                    f(ChunkEvent {
                        column: &chunk.column_path,
                        row_start: chunk.row_start,
                        row_end: chunk.row_end,
                        rows: &chunk.rows,
                    });
                }
            }
            if let (Some(f), Some(first), Some(last)) = (
                on_chunk.as_mut(),
                column_chunks.first(),
                column_chunks.last(),
            ) {
                let rows: Vec<Value> = column_chunks
                    .iter()
                    .flat_map(|c| c.rows.iter().cloned())
                    .collect();
                f(ChunkEvent {
                    column: &first.column_path,
                    row_start: first.row_start,
                    row_end: last.row_end,
                    rows: &rows,
                });
            }
        }

        // concatenate each column's chunks, keyed by dotted path
        let mut subcolumns: HashMap<String, Vec<Value>> = HashMap::new();
        for column_chunks in columns_data {
            for chunk in column_chunks {
                subcolumns
                    .entry(chunk.column_path.clone())
                    .or_default()
                    .extend(chunk.rows);
            }
        }

        // assemble nested top-level columns, then transpose to rows
        let mut ordered: Vec<(Arc<str>, std::vec::IntoIter<Value>)> = Vec::new();
        for child in &schema.root().children {
            let name = child.element.name.as_str();
            if !requested(name) {
                continue;
            }
            if !child.children.is_empty() {
                if !leaves_present(child, &subcolumns) {
                    continue;
                }
                assemble_nested(&mut subcolumns, child, 0)?;
            }
            if let Some(data) = subcolumns.remove(name) {
                let skipped = data.into_iter().skip(group.select_start as usize);
                ordered.push((Arc::from(name), skipped.collect::<Vec<_>>().into_iter()));
            }
        }

        for _ in group.select_start..group.select_end {
            let row: Vec<(Arc<str>, Value)> = ordered
                .iter_mut()
                .map(|(name, values)| (name.clone(), values.next().unwrap_or(Value::Null)))
                .collect();
            rows.push(match row_format {
                RowFormat::Object => Value::Record(row),
                RowFormat::Array => Value::List(row.into_iter().map(|(_, v)| v).collect()),
            });
        }
    }

    Ok(rows)
}

fn leaves_present(node: &SchemaNode, subcolumns: &HashMap<String, Vec<Value>>) -> bool {
    if node.children.is_empty() {
        return subcolumns.contains_key(&node.path.join("."));
    }
    node.children
        .iter()
        .all(|child| leaves_present(child, subcolumns))
}

/// Reads rows as name-keyed records, buffered in row order.
pub async fn read_objects(options: ReadOptions) -> Result<Vec<Value>> {
    read(options.with_row_format(RowFormat::Object)).await
}

/// Reads rows as positional arrays, buffered in row order.
pub async fn read_arrays(options: ReadOptions) -> Result<Vec<Value>> {
    read(options.with_row_format(RowFormat::Array)).await
}
