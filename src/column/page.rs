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

//! Page header parsing and data page decoding.
//!
//! A column chunk is a sequence of `[page header | page data]` pairs. The
//! header is a Thrift struct; its `compressed_page_size` delimits the data.
//! Decompression happens in the column reader so this module is purely
//! about decoding bytes already in memory.

use bytes::Bytes;

use crate::basic::{Encoding, PageType, Type};
use crate::data_type::Values;
use crate::encodings::byte_stream_split::read_byte_stream_split;
use crate::encodings::delta::{
    read_delta_binary_packed, read_delta_byte_array, read_delta_length_byte_array,
};
use crate::encodings::plain::read_plain;
use crate::encodings::rle::read_rle_bitpacked_hybrid;
use crate::errors::{ParquetError, Result};
use crate::thrift::{ThriftCompactReader, ThriftStruct};
use crate::util::bit_util::num_required_bits;

/// Decoded Thrift page header.
#[derive(Clone, Debug)]
pub struct PageHeader {
    /// What kind of page follows.
    pub page_type: PageType,
    /// Size of the page data once decompressed.
    pub uncompressed_page_size: i32,
    /// Size of the page data as stored.
    pub compressed_page_size: i32,
    /// Header for DATA_PAGE pages.
    pub data_page_header: Option<DataPageHeader>,
    /// Header for DICTIONARY_PAGE pages.
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    /// Header for DATA_PAGE_V2 pages.
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

/// Header of a v1 data page.
#[derive(Clone, Debug)]
pub struct DataPageHeader {
    /// Number of values in the page, nulls included.
    pub num_values: i32,
    /// Encoding of the value payload.
    pub encoding: Encoding,
    /// Encoding of the definition levels; always the RLE hybrid in practice.
    pub definition_level_encoding: Encoding,
    /// Encoding of the repetition levels; always the RLE hybrid in practice.
    pub repetition_level_encoding: Encoding,
}

/// Header of a dictionary page.
#[derive(Clone, Debug)]
pub struct DictionaryPageHeader {
    /// Number of dictionary entries.
    pub num_values: i32,
    /// Encoding of the entries; PLAIN or the deprecated PLAIN_DICTIONARY,
    /// which means the same thing here.
    pub encoding: Encoding,
}

/// Header of a v2 data page.
#[derive(Clone, Debug)]
pub struct DataPageHeaderV2 {
    /// Number of values in the page, nulls included.
    pub num_values: i32,
    /// Number of nulls in the page.
    pub num_nulls: i32,
    /// Number of rows in the page; a row can span pages only in v1.
    pub num_rows: i32,
    /// Encoding of the value payload.
    pub encoding: Encoding,
    /// Byte length of the definition level run.
    pub definition_levels_byte_length: i32,
    /// Byte length of the repetition level run.
    pub repetition_levels_byte_length: i32,
    /// Whether the value payload is compressed. Levels never are.
    pub is_compressed: bool,
}

/// Reads one page header, leaving the reader at the page data.
pub fn read_page_header(reader: &mut ThriftCompactReader<'_>) -> Result<PageHeader> {
    let decoded = reader.read_struct()?;
    parse_page_header(&decoded)
}

fn parse_page_header(s: &ThriftStruct<'_>) -> Result<PageHeader> {
    Ok(PageHeader {
        page_type: PageType::try_from(s.required_i32(1, "page type")?)?,
        uncompressed_page_size: s.required_i32(2, "uncompressed_page_size")?,
        compressed_page_size: s.required_i32(3, "compressed_page_size")?,
        data_page_header: s.get_struct(5)?.map(parse_data_page_header).transpose()?,
        dictionary_page_header: s
            .get_struct(7)?
            .map(parse_dictionary_page_header)
            .transpose()?,
        data_page_header_v2: s
            .get_struct(8)?
            .map(parse_data_page_header_v2)
            .transpose()?,
    })
}

fn parse_data_page_header(s: &ThriftStruct<'_>) -> Result<DataPageHeader> {
    Ok(DataPageHeader {
        num_values: s.required_i32(1, "num_values")?,
        encoding: Encoding::try_from(s.required_i32(2, "encoding")?)?,
        definition_level_encoding: Encoding::try_from(
            s.required_i32(3, "definition_level_encoding")?,
        )?,
        repetition_level_encoding: Encoding::try_from(
            s.required_i32(4, "repetition_level_encoding")?,
        )?,
    })
}

fn parse_dictionary_page_header(s: &ThriftStruct<'_>) -> Result<DictionaryPageHeader> {
    Ok(DictionaryPageHeader {
        num_values: s.required_i32(1, "num_values")?,
        encoding: Encoding::try_from(s.required_i32(2, "encoding")?)?,
    })
}

fn parse_data_page_header_v2(s: &ThriftStruct<'_>) -> Result<DataPageHeaderV2> {
    Ok(DataPageHeaderV2 {
        num_values: s.required_i32(1, "num_values")?,
        num_nulls: s.required_i32(2, "num_nulls")?,
        num_rows: s.required_i32(3, "num_rows")?,
        encoding: Encoding::try_from(s.required_i32(4, "encoding")?)?,
        definition_levels_byte_length: s.required_i32(5, "definition_levels_byte_length")?,
        repetition_levels_byte_length: s.required_i32(6, "repetition_levels_byte_length")?,
        is_compressed: s.get_bool(7)?.unwrap_or(true),
    })
}

/// What the page decoder needs to know about the column.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PageContext {
    pub physical_type: Type,
    pub type_length: Option<i32>,
    pub max_rep: u32,
    pub max_def: u32,
}

/// One decoded data page, before conversion and assembly.
#[derive(Debug)]
pub(crate) struct PageValues {
    pub values: Values,
    /// Present only when the page has nulls.
    pub def_levels: Option<Vec<u32>>,
    /// Empty for columns without repetition.
    pub rep_levels: Vec<u32>,
    /// Level count, nulls included.
    pub num_values: usize,
}

/// Decodes a v1 data page from its decompressed bytes: repetition levels,
/// definition levels, then the value payload.
pub(crate) fn decode_data_page_v1(
    page: &Bytes,
    header: &DataPageHeader,
    ctx: &PageContext,
) -> Result<PageValues> {
    let num_values = usize::try_from(header.num_values)
        .map_err(|_| general_err!("Page has negative num_values"))?;
    let mut pos = 0usize;

    let rep_levels = if ctx.max_rep > 0 {
        read_rle_bitpacked_hybrid(
            page,
            &mut pos,
            num_required_bits(ctx.max_rep as u64),
            num_values,
            None,
        )?
    } else {
        Vec::new()
    };

    let (def_levels, num_nulls) = if ctx.max_def > 0 {
        let levels = read_rle_bitpacked_hybrid(
            page,
            &mut pos,
            num_required_bits(ctx.max_def as u64),
            num_values,
            None,
        )?;
        let num_nulls = levels.iter().filter(|d| **d != ctx.max_def).count();
        // fully defined pages don't need their levels
        ((num_nulls > 0).then_some(levels), num_nulls)
    } else {
        (None, 0)
    };

    let values = decode_page_values(page, &mut pos, header.encoding, ctx, num_values - num_nulls)?;
    Ok(PageValues {
        values,
        def_levels,
        rep_levels,
        num_values,
    })
}

/// Decodes a v2 data page. `levels` is the uncompressed level region;
/// `values` is the value payload, already decompressed by the caller when
/// the page was compressed.
pub(crate) fn decode_data_page_v2(
    levels: &Bytes,
    values: &Bytes,
    header: &DataPageHeaderV2,
    ctx: &PageContext,
) -> Result<PageValues> {
    let num_values = usize::try_from(header.num_values)
        .map_err(|_| general_err!("Page has negative num_values"))?;
    let num_nulls = usize::try_from(header.num_nulls)
        .map_err(|_| general_err!("Page has negative num_nulls"))?;
    let rep_len = header.repetition_levels_byte_length.max(0) as usize;
    let def_len = header.definition_levels_byte_length.max(0) as usize;

    let mut pos = 0usize;
    let rep_levels = if ctx.max_rep > 0 {
        read_rle_bitpacked_hybrid(
            levels,
            &mut pos,
            num_required_bits(ctx.max_rep as u64),
            num_values,
            Some(rep_len),
        )?
    } else {
        pos += rep_len;
        Vec::new()
    };

    let def_levels = if ctx.max_def > 0 {
        let decoded = read_rle_bitpacked_hybrid(
            levels,
            &mut pos,
            num_required_bits(ctx.max_def as u64),
            num_values,
            Some(def_len),
        )?;
        (num_nulls > 0).then_some(decoded)
    } else {
        None
    };

    let mut pos = 0usize;
    let values = decode_page_values(values, &mut pos, header.encoding, ctx, num_values - num_nulls)?;
    Ok(PageValues {
        values,
        def_levels,
        rep_levels,
        num_values,
    })
}

/// Decodes a dictionary page's entries from its decompressed bytes.
pub(crate) fn decode_dictionary_page(
    page: &Bytes,
    header: &DictionaryPageHeader,
    ctx: &PageContext,
) -> Result<Values> {
    if !matches!(header.encoding, Encoding::PLAIN | Encoding::PLAIN_DICTIONARY) {
        return Err(ParquetError::UnsupportedEncoding(header.encoding));
    }
    let num_values = usize::try_from(header.num_values)
        .map_err(|_| general_err!("Dictionary has negative num_values"))?;
    let mut pos = 0usize;
    read_plain(page, &mut pos, ctx.physical_type, num_values, ctx.type_length)
}

fn decode_page_values(
    page: &Bytes,
    pos: &mut usize,
    encoding: Encoding,
    ctx: &PageContext,
    count: usize,
) -> Result<Values> {
    match encoding {
        Encoding::PLAIN => read_plain(page, pos, ctx.physical_type, count, ctx.type_length),
        Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY | Encoding::RLE => {
            if ctx.physical_type == Type::BOOLEAN {
                // RLE boolean values: length-prefixed run at bit width 1
                let decoded = read_rle_bitpacked_hybrid(page, pos, 1, count, None)?;
                return Ok(Values::Bool(decoded.into_iter().map(|v| v != 0).collect()));
            }
            let bit_width = *page
                .get(*pos)
                .ok_or_else(|| eof_err!("Unexpected end of dictionary index page"))?;
            *pos += 1;
            if bit_width == 0 {
                return Ok(Values::Indices(vec![0; count]));
            }
            // the index run owns the rest of the page
            let remaining = page.len() - *pos;
            let decoded =
                read_rle_bitpacked_hybrid(page, pos, bit_width, count, Some(remaining))?;
            Ok(Values::Indices(decoded))
        }
        Encoding::DELTA_BINARY_PACKED => {
            let decoded = read_delta_binary_packed(page, pos)?;
            if decoded.len() < count {
                return Err(ParquetError::DeltaDecode(format!(
                    "page encodes {} values, expected {}",
                    decoded.len(),
                    count
                )));
            }
            match ctx.physical_type {
                Type::INT32 => Ok(Values::Int32(decoded.into_iter().map(|v| v as i32).collect())),
                Type::INT64 => Ok(Values::Int64(decoded)),
                other => Err(ParquetError::UnsupportedType(other)),
            }
        }
        Encoding::DELTA_LENGTH_BYTE_ARRAY => {
            Ok(Values::Bytes(read_delta_length_byte_array(page, pos)?))
        }
        Encoding::DELTA_BYTE_ARRAY => Ok(Values::Bytes(read_delta_byte_array(page, pos)?)),
        Encoding::BYTE_STREAM_SPLIT => {
            let width = match ctx.physical_type {
                Type::INT32 | Type::FLOAT => 4,
                Type::INT64 | Type::DOUBLE => 8,
                Type::FIXED_LEN_BYTE_ARRAY => match ctx.type_length {
                    Some(len) if len > 0 => len as usize,
                    _ => {
                        return Err(schema_err!(
                            "FIXED_LEN_BYTE_ARRAY column is missing its type_length"
                        ))
                    }
                },
                other => return Err(ParquetError::UnsupportedType(other)),
            };
            let recombined = Bytes::from(read_byte_stream_split(page, pos, count, width)?);
            let mut plain_pos = 0usize;
            read_plain(
                &recombined,
                &mut plain_pos,
                ctx.physical_type,
                count,
                ctx.type_length,
            )
        }
        other => Err(ParquetError::UnsupportedEncoding(other)),
    }
}
