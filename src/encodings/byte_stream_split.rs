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

//! Decoder for the BYTE_STREAM_SPLIT encoding.
//!
//! The encoder scatters byte `b` of each fixed-width value into stream `b`;
//! decoding gathers byte `b` of value `i` from position `i` of stream `b`.

use crate::errors::{ParquetError, Result};

/// Reassembles `count` values of `width` bytes from their split streams,
/// returning the values in their PLAIN layout.
pub fn read_byte_stream_split(
    data: &[u8],
    pos: &mut usize,
    count: usize,
    width: usize,
) -> Result<Vec<u8>> {
    let total = count
        .checked_mul(width)
        .ok_or_else(|| general_err!("byte stream length overflows"))?;
    let streams = data
        .get(*pos..*pos + total)
        .ok_or_else(|| eof_err!("Unexpected end of byte stream split data"))?;
    *pos += total;

    let mut values = vec![0u8; total];
    for (b, stream) in streams.chunks_exact(count.max(1)).take(width).enumerate() {
        for (i, byte) in stream.iter().enumerate() {
            values[i * width + b] = *byte;
        }
    }
    Ok(values)
}
