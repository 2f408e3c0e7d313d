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

//! Decoders for the delta encoding family: [DELTA_BINARY_PACKED],
//! DELTA_LENGTH_BYTE_ARRAY and DELTA_BYTE_ARRAY.
//!
//! [DELTA_BINARY_PACKED]: https://github.com/apache/parquet-format/blob/master/Encodings.md#delta-encoding-delta_binary_packed--5

use bytes::Bytes;

use crate::errors::{ParquetError, Result};
use crate::util::bit_util::BitReader;

/// Decodes a DELTA_BINARY_PACKED run from `data` at `pos`.
///
/// Returns the decoded values; deltas may legitimately overflow (e.g.
/// `i64::MAX - i64::MIN`), so reconstruction uses wrapping arithmetic.
/// The cursor lands one past the run, including any padding of a partially
/// used final miniblock, so a following payload can be read.
pub fn read_delta_binary_packed(data: &[u8], pos: &mut usize) -> Result<Vec<i64>> {
    let mut reader = BitReader::new(&data[*pos..]);

    let block_size = reader
        .get_vlq_int()
        .ok_or_else(|| ParquetError::DeltaDecode("missing block size".to_string()))?
        as usize;
    let miniblocks_per_block = reader
        .get_vlq_int()
        .ok_or_else(|| ParquetError::DeltaDecode("missing miniblock count".to_string()))?
        as usize;
    let total_count = reader
        .get_vlq_int()
        .ok_or_else(|| ParquetError::DeltaDecode("missing value count".to_string()))?
        as usize;
    let first_value = reader
        .get_zigzag_vlq_int()
        .ok_or_else(|| ParquetError::DeltaDecode("missing first value".to_string()))?;

    if block_size == 0 || block_size % 128 != 0 {
        return Err(ParquetError::DeltaDecode(format!(
            "block size must be a multiple of 128, got {block_size}"
        )));
    }
    if miniblocks_per_block == 0 || block_size % miniblocks_per_block != 0 {
        return Err(ParquetError::DeltaDecode(format!(
            "block size {block_size} is not divisible into {miniblocks_per_block} miniblocks"
        )));
    }
    let values_per_miniblock = block_size / miniblocks_per_block;
    if values_per_miniblock % 32 != 0 {
        return Err(ParquetError::DeltaDecode(format!(
            "miniblock size must be a multiple of 32, got {values_per_miniblock}"
        )));
    }

    let mut values = Vec::with_capacity(total_count);
    if total_count > 0 {
        values.push(first_value);
    }

    let mut last_value = first_value;
    let mut block_end = reader.byte_offset();
    while values.len() < total_count {
        // block header: zigzag min delta, then one bit width per miniblock
        let min_delta = reader
            .get_zigzag_vlq_int()
            .ok_or_else(|| ParquetError::DeltaDecode("missing min delta".to_string()))?;
        let widths: Vec<u8> = reader
            .get_aligned_bytes(miniblocks_per_block)
            .ok_or_else(|| ParquetError::DeltaDecode("missing miniblock bit widths".to_string()))?
            .to_vec();

        // end offset of the whole block; trailing miniblocks that hold no
        // values contribute no bytes
        let mut remaining = total_count - values.len();
        block_end = reader.byte_offset();
        for &width in &widths {
            if remaining == 0 {
                break;
            }
            remaining = remaining.saturating_sub(values_per_miniblock);
            block_end += width as usize * values_per_miniblock / 8;
        }

        for &width in &widths {
            if values.len() == total_count {
                break;
            }
            let needed = (total_count - values.len()).min(values_per_miniblock);
            for _ in 0..needed {
                let unpacked = reader
                    .get_value(width as usize)
                    .ok_or_else(|| ParquetError::DeltaDecode("miniblock is truncated".to_string()))?
                    as i64;
                last_value = last_value.wrapping_add(min_delta).wrapping_add(unpacked);
                values.push(last_value);
            }
            if needed < values_per_miniblock {
                // skip the padding of the partially consumed miniblock
                reader.skip_values(values_per_miniblock - needed, width as usize);
            }
        }
    }

    *pos += reader.byte_offset().max(block_end);
    Ok(values)
}

fn usize_lengths(lengths: Vec<i64>, what: &str) -> Result<Vec<usize>> {
    lengths
        .into_iter()
        .map(|len| {
            usize::try_from(len)
                .map_err(|_| ParquetError::DeltaDecode(format!("negative {what} length: {len}")))
        })
        .collect()
}

/// Decodes a DELTA_LENGTH_BYTE_ARRAY run: delta-packed lengths followed by
/// the concatenated value bytes, sliced zero-copy.
pub fn read_delta_length_byte_array(page: &Bytes, pos: &mut usize) -> Result<Vec<Bytes>> {
    let lengths = usize_lengths(read_delta_binary_packed(page, pos)?, "byte array")?;
    let mut values = Vec::with_capacity(lengths.len());
    for len in lengths {
        if page.len() < *pos + len {
            return Err(eof_err!("Unexpected end of delta byte array data"));
        }
        values.push(page.slice(*pos..*pos + len));
        *pos += len;
    }
    Ok(values)
}

/// Decodes a DELTA_BYTE_ARRAY run: delta-packed prefix lengths and suffix
/// lengths, then concatenated suffixes. Each value shares `prefix_len`
/// leading bytes with its predecessor.
pub fn read_delta_byte_array(page: &Bytes, pos: &mut usize) -> Result<Vec<Bytes>> {
    let prefix_lengths = usize_lengths(read_delta_binary_packed(page, pos)?, "prefix")?;
    let suffix_lengths = usize_lengths(read_delta_binary_packed(page, pos)?, "suffix")?;
    if prefix_lengths.len() != suffix_lengths.len() {
        return Err(ParquetError::DeltaDecode(format!(
            "prefix and suffix counts differ: {} vs {}",
            prefix_lengths.len(),
            suffix_lengths.len()
        )));
    }

    let mut values: Vec<Bytes> = Vec::with_capacity(prefix_lengths.len());
    for (prefix_len, suffix_len) in prefix_lengths.into_iter().zip(suffix_lengths) {
        if page.len() < *pos + suffix_len {
            return Err(eof_err!("Unexpected end of delta byte array suffixes"));
        }
        let suffix = &page[*pos..*pos + suffix_len];
        *pos += suffix_len;

        if prefix_len == 0 {
            values.push(page.slice_ref(suffix));
            continue;
        }
        let previous = values
            .last()
            .filter(|v| v.len() >= prefix_len)
            .ok_or_else(|| {
                ParquetError::DeltaDecode(format!("prefix of {prefix_len} bytes has no source"))
            })?;
        let mut value = Vec::with_capacity(prefix_len + suffix_len);
        value.extend_from_slice(&previous[..prefix_len]);
        value.extend_from_slice(suffix);
        values.push(value.into());
    }
    Ok(values)
}
