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

//! Decoder for the [RLE/bit-packed hybrid encoding], used for repetition
//! and definition levels, dictionary indices and boolean values.
//!
//! The encoded stream alternates two kinds of runs behind a varint header:
//! `header & 1 == 0` is an RLE run of `header >> 1` copies of one
//! byte-aligned value, `header & 1 == 1` is `(header >> 1) * 8` bit-packed
//! values, LSB first.
//!
//! [RLE/bit-packed hybrid encoding]: https://github.com/apache/parquet-format/blob/master/Encodings.md#run-length-encoding--bit-packing-hybrid-rle--3

use crate::errors::{ParquetError, Result};
use crate::util::bit_util::{ceil, BitReader};

fn read_vlq(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| eof_err!("Unexpected end of RLE run header"))?;
        *pos += 1;
        value |= ((byte & 0x7f) as u64).wrapping_shl(shift);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(general_err!("RLE run header varint is too long"));
        }
    }
}

/// Decodes `count` values from the RLE/bit-packed hybrid stream at `pos`.
///
/// With `explicit_length` of `None` the stream starts with its own u32
/// little-endian byte length. Either way the cursor ends exactly `length`
/// bytes past the start of the run data, regardless of how much of it the
/// requested `count` consumed; writers pad the tail.
///
/// When `length` is not known at all (dictionary-index pages, which own the
/// rest of the page) pass `Some(remaining)` for the remainder of the buffer.
pub fn read_rle_bitpacked_hybrid(
    data: &[u8],
    pos: &mut usize,
    bit_width: u8,
    count: usize,
    explicit_length: Option<usize>,
) -> Result<Vec<u32>> {
    let length = match explicit_length {
        Some(length) => length,
        None => {
            let prefix = data
                .get(*pos..*pos + 4)
                .ok_or_else(|| eof_err!("Unexpected end of RLE length prefix"))?;
            *pos += 4;
            u32::from_le_bytes(prefix.try_into().unwrap()) as usize
        }
    };
    let start = *pos;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| eof_err!("RLE run length exceeds buffer"))?;

    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let header = read_vlq(&data[..end], pos)?;
        if header & 1 == 0 {
            // RLE run: one byte-aligned value repeated
            let run = (header >> 1) as usize;
            let value_width = ceil(bit_width as usize, 8);
            let value_bytes = data[..end]
                .get(*pos..*pos + value_width)
                .ok_or_else(|| eof_err!("Unexpected end of RLE run value"))?;
            *pos += value_width;
            let mut value = 0u32;
            for (i, byte) in value_bytes.iter().enumerate() {
                value |= (*byte as u32) << (8 * i);
            }
            let take = run.min(count - out.len());
            out.resize(out.len() + take, value);
        } else {
            // bit-packed group of (header >> 1) * 8 values
            let group_values = (header >> 1) as usize * 8;
            let group_bytes = ceil(group_values * bit_width as usize, 8);
            let available = &data[*pos..end.min(*pos + group_bytes)];
            let mut reader = BitReader::new(available);
            let needed = group_values.min(count - out.len());
            for _ in 0..needed {
                let value = reader
                    .get_value(bit_width as usize)
                    .ok_or(ParquetError::BitpackOutOfBounds)?;
                out.push(value as u32);
            }
            // the rest of the group is padding
            *pos = (*pos + group_bytes).min(end);
        }
    }

    *pos = end;
    Ok(out)
}
