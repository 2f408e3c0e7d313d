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

//! Reads one column chunk: iterates its pages, decompresses and decodes
//! them, and accumulates converted per-row values.
//!
//! Columns without repetition produce one chunk per data page. Columns with
//! repetition accumulate into a single chunk, because a row may span page
//! boundaries and later pages then extend rows the earlier pages opened.

use std::sync::Arc;

use bytes::Bytes;

use crate::basic::{Compression, PageType, Repetition, Type};
use crate::column::page::{
    decode_data_page_v1, decode_data_page_v2, decode_dictionary_page, read_page_header,
    PageContext, PageValues,
};
use crate::compression::{create_codec, Codec, DecompressFn, Decompressors};
use crate::convert::{convert_values, convert_with_dictionary, Parsers};
use crate::data_type::Value;
use crate::errors::{ParquetError, Result};
use crate::file::metadata::ColumnMetaData;
use crate::record::assembler::assemble_lists;
use crate::schema::types::{
    is_flat_column, max_definition_level, max_repetition_level, SchemaElement, SchemaTree,
};
use crate::thrift::ThriftCompactReader;

/// Everything needed to decode one column chunk's pages.
pub(crate) struct ColumnDecoder {
    /// Dotted column path, for error messages and events.
    pub column_path: String,
    /// Leaf schema element.
    pub element: Arc<SchemaElement>,
    /// Repetition of each element from the root to the leaf.
    pub rep_path: Vec<Repetition>,
    pub ctx: PageContext,
    /// Direct, non-repeated leaf child of the root.
    pub is_flat: bool,
    codec: Compression,
    codec_impl: Option<Box<dyn Codec>>,
    custom_decompress: Option<DecompressFn>,
    pub utf8: bool,
}

impl std::fmt::Debug for ColumnDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDecoder")
            .field("column_path", &self.column_path)
            .field("element", &self.element)
            .field("rep_path", &self.rep_path)
            .field("ctx", &self.ctx)
            .field("is_flat", &self.is_flat)
            .field("codec", &self.codec)
            .field("codec_impl", &self.codec_impl.as_ref().map(|_| "<codec>"))
            .field(
                "custom_decompress",
                &self.custom_decompress.as_ref().map(|_| "<fn>"),
            )
            .field("utf8", &self.utf8)
            .finish()
    }
}

impl ColumnDecoder {
    /// Builds a decoder for `meta` against the file schema.
    pub fn new(
        meta: &ColumnMetaData,
        schema: &SchemaTree,
        decompressors: &Decompressors,
        utf8: bool,
    ) -> Result<Self> {
        let path = schema.path_lookup(&meta.path_in_schema)?;
        let leaf = *path.last().unwrap();
        let element = leaf.element.clone();
        let physical_type = element.physical_type.unwrap_or(meta.physical_type);

        let custom_decompress = decompressors.get(meta.codec).cloned();
        let codec_impl = match custom_decompress {
            Some(_) => None,
            None => create_codec(meta.codec)?,
        };

        Ok(Self {
            column_path: meta.column_path(),
            rep_path: path.iter().map(|node| node.repetition()).collect(),
            ctx: PageContext {
                physical_type,
                type_length: element.type_length,
                max_rep: max_repetition_level(&path) as u32,
                max_def: max_definition_level(&path) as u32,
            },
            is_flat: is_flat_column(&path),
            codec: meta.codec,
            codec_impl,
            custom_decompress,
            element,
            utf8,
        })
    }

    fn decompress(&mut self, input: Bytes, uncompress_size: usize) -> Result<Bytes> {
        if let Some(custom) = &self.custom_decompress {
            let out = custom(&input, uncompress_size)?;
            if out.len() != uncompress_size {
                return Err(general_err!(
                    "Decompressor returned {} bytes, page header says {}",
                    out.len(),
                    uncompress_size
                ));
            }
            return Ok(Bytes::from(out));
        }
        match &mut self.codec_impl {
            None => Ok(input),
            Some(codec) => {
                let mut out = Vec::new();
                codec.decompress(&input, &mut out, uncompress_size)?;
                Ok(Bytes::from(out))
            }
        }
    }
}

/// One run of decoded rows of a single column.
#[derive(Clone, Debug)]
pub struct ColumnChunkData {
    /// Dotted column path.
    pub column_path: String,
    /// Absolute row index of the first row.
    pub row_start: u64,
    /// Absolute row index one past the last row.
    pub row_end: u64,
    /// One value per row. For columns under repeated or optional groups
    /// these are the wrapper lists consumed by nested assembly.
    pub rows: Vec<Value>,
}

/// Decodes the pages of one column chunk into per-row values.
///
/// Rows `[0, select_end)` of the group are materialised (pages wholly before
/// `select_start` become placeholder nulls for flat columns); the caller
/// discards rows before `select_start` after assembly. `group_start` is the
/// absolute row index of the group, used for the chunk row ranges.
pub(crate) fn read_column_chunk(
    chunk: &Bytes,
    decoder: &mut ColumnDecoder,
    parsers: &Parsers,
    group_start: u64,
    select_start: u64,
    select_end: u64,
) -> Result<Vec<ColumnChunkData>> {
    let nested = decoder.ctx.max_rep > 0;
    let mut pos = 0usize;
    let mut dictionary: Option<Vec<Value>> = None;
    let mut chunks: Vec<ColumnChunkData> = Vec::new();
    let mut rows_read: u64 = 0;
    let mut nested_rows: Vec<Value> = Vec::new();

    while pos < chunk.len() {
        if !nested && rows_read >= select_end {
            break;
        }

        let mut reader = ThriftCompactReader::new(&chunk[pos..]);
        let header = read_page_header(&mut reader)?;
        let data_start = pos + reader.offset();
        let compressed_len = usize::try_from(header.compressed_page_size)
            .map_err(|_| general_err!("Page has negative compressed size"))?;
        let data_end = data_start
            .checked_add(compressed_len)
            .filter(|end| *end <= chunk.len())
            .ok_or_else(|| eof_err!("Page data runs past the end of the column chunk"))?;
        let page_data = chunk.slice(data_start..data_end);
        pos = data_end;

        let uncompressed_len = usize::try_from(header.uncompressed_page_size)
            .map_err(|_| general_err!("Page has negative uncompressed size"))?;

        match header.page_type {
            PageType::INDEX_PAGE => {}
            PageType::DICTIONARY_PAGE => {
                if dictionary.is_some() {
                    return Err(general_err!(
                        "Column {} has more than one dictionary page",
                        decoder.column_path
                    ));
                }
                let dict_header = header.dictionary_page_header.as_ref().ok_or_else(|| {
                    general_err!("Dictionary page is missing its header")
                })?;
                let page = decoder.decompress(page_data, uncompressed_len)?;
                let entries = decode_dictionary_page(&page, dict_header, &decoder.ctx)?;
                dictionary = Some(convert_values(
                    entries,
                    &decoder.element,
                    parsers,
                    decoder.utf8,
                )?);
            }
            PageType::DATA_PAGE => {
                let dph = header
                    .data_page_header
                    .clone()
                    .ok_or_else(|| general_err!("Data page is missing its header"))?;
                let num_values = dph.num_values.max(0) as u64;

                if decoder.is_flat && rows_read + num_values <= select_start {
                    // wholly before the selected rows: keep the row accounting
                    // without decoding; these placeholders never surface
                    chunks.push(ColumnChunkData {
                        column_path: decoder.column_path.clone(),
                        row_start: group_start + rows_read,
                        row_end: group_start + rows_read + num_values,
                        rows: vec![Value::Null; num_values as usize],
                    });
                    rows_read += num_values;
                    continue;
                }

                let page = decoder.decompress(page_data, uncompressed_len)?;
                let decoded = decode_data_page_v1(&page, &dph, &decoder.ctx)?;
                emit_page(
                    decoded,
                    dph.encoding,
                    decoder,
                    parsers,
                    dictionary.as_deref(),
                    nested,
                    &mut nested_rows,
                    &mut chunks,
                    &mut rows_read,
                    group_start,
                    select_end,
                )?;
            }
            PageType::DATA_PAGE_V2 => {
                let dph = header
                    .data_page_header_v2
                    .clone()
                    .ok_or_else(|| general_err!("Data page v2 is missing its header"))?;
                let num_rows = dph.num_rows.max(0) as u64;

                if decoder.is_flat && rows_read + num_rows <= select_start {
                    chunks.push(ColumnChunkData {
                        column_path: decoder.column_path.clone(),
                        row_start: group_start + rows_read,
                        row_end: group_start + rows_read + num_rows,
                        rows: vec![Value::Null; num_rows as usize],
                    });
                    rows_read += num_rows;
                    continue;
                }

                let level_len = dph.repetition_levels_byte_length.max(0) as usize
                    + dph.definition_levels_byte_length.max(0) as usize;
                if level_len > page_data.len() {
                    return Err(eof_err!("Page levels run past the end of the page"));
                }
                let levels = page_data.slice(..level_len);
                let raw_values = page_data.slice(level_len..);
                let values = if dph.is_compressed {
                    let expected = uncompressed_len.saturating_sub(level_len);
                    decoder.decompress(raw_values, expected)?
                } else {
                    raw_values
                };
                let decoded = decode_data_page_v2(&levels, &values, &dph, &decoder.ctx)?;
                emit_page(
                    decoded,
                    dph.encoding,
                    decoder,
                    parsers,
                    dictionary.as_deref(),
                    nested,
                    &mut nested_rows,
                    &mut chunks,
                    &mut rows_read,
                    group_start,
                    select_end,
                )?;
            }
        }
    }

    if nested {
        nested_rows.truncate(select_end as usize);
        let row_end = group_start + nested_rows.len() as u64;
        chunks.push(ColumnChunkData {
            column_path: decoder.column_path.clone(),
            row_start: group_start,
            row_end,
            rows: nested_rows,
        });
    }
    Ok(chunks)
}

#[allow(clippy::too_many_arguments)]
fn emit_page(
    decoded: PageValues,
    encoding: crate::basic::Encoding,
    decoder: &ColumnDecoder,
    parsers: &Parsers,
    dictionary: Option<&[Value]>,
    nested: bool,
    nested_rows: &mut Vec<Value>,
    chunks: &mut Vec<ColumnChunkData>,
    rows_read: &mut u64,
    group_start: u64,
    select_end: u64,
) -> Result<()> {
    let PageValues {
        values,
        def_levels,
        rep_levels,
        num_values,
    } = decoded;
    let converted = convert_with_dictionary(
        values,
        dictionary,
        &decoder.element,
        encoding,
        parsers,
        decoder.utf8,
    )?;

    if nested {
        assemble_lists(
            nested_rows,
            def_levels.as_deref(),
            &rep_levels,
            converted,
            &decoder.rep_path,
            decoder.ctx.max_def,
            num_values,
        )?;
        *rows_read = nested_rows.len() as u64;
        return Ok(());
    }

    let mut rows = if decoder.ctx.max_def > 0 {
        let mut rows = Vec::with_capacity(num_values);
        assemble_lists(
            &mut rows,
            def_levels.as_deref(),
            &rep_levels,
            converted,
            &decoder.rep_path,
            decoder.ctx.max_def,
            num_values,
        )?;
        rows
    } else {
        converted
    };

    if *rows_read + rows.len() as u64 > select_end {
        rows.truncate((select_end - *rows_read) as usize);
    }
    let row_start = group_start + *rows_read;
    *rows_read += rows.len() as u64;
    chunks.push(ColumnChunkData {
        column_path: decoder.column_path.clone(),
        row_start,
        row_end: group_start + *rows_read,
        rows,
    });
    Ok(())
}
