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

//! Builds small Parquet files in memory for the integration tests: a
//! minimal Thrift compact protocol writer plus page and footer encoders.

#![allow(dead_code)]

use bytes::Bytes;

/// A tiny Thrift compact protocol writer. Field ids must be written in
/// increasing order with deltas of at most 15, which holds for everything
/// the Parquet footer needs.
#[derive(Default)]
pub struct ThriftWriter {
    pub out: Vec<u8>,
    last_id: i16,
}

impl ThriftWriter {
    pub fn vlq(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.out.push(byte);
                return;
            }
            self.out.push(byte | 0x80);
        }
    }

    pub fn zig_zag(&mut self, v: i64) {
        self.vlq(((v << 1) ^ (v >> 63)) as u64);
    }

    fn field_header(&mut self, id: i16, field_type: u8) {
        let delta = id - self.last_id;
        assert!((1..=15).contains(&delta), "field ids must ascend");
        self.out.push(((delta as u8) << 4) | field_type);
        self.last_id = id;
    }

    pub fn field_bool(&mut self, id: i16, v: bool) {
        self.field_header(id, if v { 1 } else { 2 });
    }

    pub fn field_i32(&mut self, id: i16, v: i32) {
        self.field_header(id, 5);
        self.zig_zag(v as i64);
    }

    pub fn field_i64(&mut self, id: i16, v: i64) {
        self.field_header(id, 6);
        self.zig_zag(v);
    }

    pub fn field_binary(&mut self, id: i16, v: &[u8]) {
        self.field_header(id, 8);
        self.vlq(v.len() as u64);
        self.out.extend_from_slice(v);
    }

    /// Begins a list field; `elem_type` is the compact type of the elements.
    pub fn field_list(&mut self, id: i16, elem_type: u8, len: usize) {
        self.field_header(id, 9);
        if len < 15 {
            self.out.push(((len as u8) << 4) | elem_type);
        } else {
            self.out.push(0xf0 | elem_type);
            self.vlq(len as u64);
        }
    }

    /// Begins a struct field. The nested struct must be written with a fresh
    /// writer or via [`Self::nested`], then closed with [`Self::stop`].
    pub fn field_struct(&mut self, id: i16) -> ThriftWriter {
        self.field_header(id, 12);
        ThriftWriter::default()
    }

    /// Appends a nested writer's bytes and the struct stop byte.
    pub fn nested(&mut self, inner: ThriftWriter) {
        self.out.extend_from_slice(&inner.out);
        self.out.push(0);
    }

    /// Appends a bare struct (list element) from a nested writer.
    pub fn element_struct(&mut self, inner: ThriftWriter) {
        self.out.extend_from_slice(&inner.out);
        self.out.push(0);
    }

    pub fn stop(mut self) -> Vec<u8> {
        self.out.push(0);
        self.out
    }
}

// Thrift enum values used by the builders.
pub const TYPE_BOOLEAN: i32 = 0;
pub const TYPE_INT32: i32 = 1;
pub const TYPE_INT64: i32 = 2;
pub const TYPE_DOUBLE: i32 = 5;
pub const TYPE_BYTE_ARRAY: i32 = 6;

pub const REQUIRED: i32 = 0;
pub const OPTIONAL: i32 = 1;
pub const REPEATED: i32 = 2;

pub const ENC_PLAIN: i32 = 0;
pub const ENC_RLE: i32 = 3;
pub const ENC_RLE_DICTIONARY: i32 = 8;

pub const CODEC_UNCOMPRESSED: i32 = 0;
pub const CODEC_SNAPPY: i32 = 1;

pub const CTYPE_UTF8: i32 = 0;
pub const CTYPE_LIST: i32 = 3;

/// One element of the flat schema list.
pub struct El {
    pub name: &'static str,
    pub physical: Option<i32>,
    pub repetition: Option<i32>,
    pub num_children: Option<i32>,
    pub converted: Option<i32>,
}

impl El {
    pub fn root(num_children: i32) -> Self {
        El {
            name: "schema",
            physical: None,
            repetition: None,
            num_children: Some(num_children),
            converted: None,
        }
    }

    pub fn leaf(name: &'static str, repetition: i32, physical: i32) -> Self {
        El {
            name,
            physical: Some(physical),
            repetition: Some(repetition),
            num_children: None,
            converted: None,
        }
    }

    pub fn group(name: &'static str, repetition: i32, num_children: i32) -> Self {
        El {
            name,
            physical: None,
            repetition: Some(repetition),
            num_children: Some(num_children),
            converted: None,
        }
    }

    pub fn converted(mut self, ctype: i32) -> Self {
        self.converted = Some(ctype);
        self
    }
}

/// One column chunk of a row group: pre-encoded pages.
pub struct Col {
    pub path: Vec<&'static str>,
    pub physical: i32,
    pub codec: i32,
    pub num_values: i64,
    /// Encoded `[header | data]` pages, dictionary page first if any.
    pub pages: Vec<Vec<u8>>,
    pub has_dict: bool,
}

pub struct Group {
    pub num_rows: i64,
    pub columns: Vec<Col>,
}

fn encode_levels(levels: &[u32], bit_width: u8) -> Vec<u8> {
    // encode as one bit-packed run, padded to a multiple of 8 values
    let groups = levels.len().div_ceil(8);
    let mut out = Vec::new();
    let mut w = ThriftWriter::default();
    w.vlq(((groups as u64) << 1) | 1);
    out.extend_from_slice(&w.out);
    let mut bit_buf = 0u64;
    let mut bit_count = 0usize;
    for i in 0..groups * 8 {
        let v = levels.get(i).copied().unwrap_or(0) as u64;
        bit_buf |= v << bit_count;
        bit_count += bit_width as usize;
        while bit_count >= 8 {
            out.push((bit_buf & 0xff) as u8);
            bit_buf >>= 8;
            bit_count -= 8;
        }
    }
    if bit_count > 0 {
        out.push((bit_buf & 0xff) as u8);
    }
    out
}

/// Level run with its little-endian length prefix, as v1 pages store it.
pub fn levels_v1(levels: &[u32], bit_width: u8) -> Vec<u8> {
    let encoded = encode_levels(levels, bit_width);
    let mut out = (encoded.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&encoded);
    out
}

/// Level run without a length prefix, as v2 pages store it.
pub fn levels_v2(levels: &[u32], bit_width: u8) -> Vec<u8> {
    encode_levels(levels, bit_width)
}

pub fn plain_i64(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_byte_array(values: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        out.extend_from_slice(&(v.len() as u32).to_le_bytes());
        out.extend_from_slice(v);
    }
    out
}

/// Dictionary indices: one byte of bit width, then a single RLE run per
/// index change would be overkill; use one bit-packed run.
pub fn dict_indices(indices: &[u32], bit_width: u8) -> Vec<u8> {
    let mut out = vec![bit_width];
    out.extend_from_slice(&encode_levels(indices, bit_width));
    out
}

fn page_header_common(w: &mut ThriftWriter, page_type: i32, uncompressed: usize, compressed: usize) {
    w.field_i32(1, page_type);
    w.field_i32(2, uncompressed as i32);
    w.field_i32(3, compressed as i32);
}

/// Encodes a v1 data page. `payload` is the uncompressed page body
/// (levels + values); `stored` the on-disk body when compressed.
pub fn data_page_v1(encoding: i32, num_values: i32, payload: &[u8], stored: Option<&[u8]>) -> Vec<u8> {
    let stored = stored.unwrap_or(payload);
    let mut w = ThriftWriter::default();
    page_header_common(&mut w, 0, payload.len(), stored.len());
    let mut dph = w.field_struct(5);
    dph.field_i32(1, num_values);
    dph.field_i32(2, encoding);
    dph.field_i32(3, ENC_RLE);
    dph.field_i32(4, ENC_RLE);
    w.nested(dph);
    let mut out = w.stop();
    out.extend_from_slice(stored);
    out
}

/// Encodes a dictionary page with PLAIN entries.
pub fn dictionary_page(num_values: i32, payload: &[u8]) -> Vec<u8> {
    let mut w = ThriftWriter::default();
    page_header_common(&mut w, 2, payload.len(), payload.len());
    let mut dph = w.field_struct(7);
    dph.field_i32(1, num_values);
    dph.field_i32(2, ENC_PLAIN);
    w.nested(dph);
    let mut out = w.stop();
    out.extend_from_slice(payload);
    out
}

/// Encodes a v2 data page; levels are stored unprefixed and uncompressed.
pub fn data_page_v2(
    num_values: i32,
    num_nulls: i32,
    num_rows: i32,
    encoding: i32,
    rep_levels: &[u8],
    def_levels: &[u8],
    values: &[u8],
) -> Vec<u8> {
    let level_len = rep_levels.len() + def_levels.len();
    let mut w = ThriftWriter::default();
    page_header_common(&mut w, 3, level_len + values.len(), level_len + values.len());
    let mut dph = w.field_struct(8);
    dph.field_i32(1, num_values);
    dph.field_i32(2, num_nulls);
    dph.field_i32(3, num_rows);
    dph.field_i32(4, encoding);
    dph.field_i32(5, def_levels.len() as i32);
    dph.field_i32(6, rep_levels.len() as i32);
    dph.field_bool(7, false);
    w.nested(dph);
    let mut out = w.stop();
    out.extend_from_slice(rep_levels);
    out.extend_from_slice(def_levels);
    out.extend_from_slice(values);
    out
}

fn write_schema_element(el: &El) -> ThriftWriter {
    let mut w = ThriftWriter::default();
    if let Some(t) = el.physical {
        w.field_i32(1, t);
    }
    if let Some(r) = el.repetition {
        w.field_i32(3, r);
    }
    w.field_binary(4, el.name.as_bytes());
    if let Some(n) = el.num_children {
        w.field_i32(5, n);
    }
    if let Some(c) = el.converted {
        w.field_i32(6, c);
    }
    w
}

/// Assembles a whole file: magic, page data, footer metadata, footer.
pub fn build_file(schema: Vec<El>, groups: Vec<Group>) -> Bytes {
    let mut buf = b"PAR1".to_vec();

    // lay out pages, collecting chunk locations
    struct ChunkLoc {
        path: Vec<&'static str>,
        physical: i32,
        codec: i32,
        num_values: i64,
        dict_offset: Option<i64>,
        data_offset: i64,
        total_size: i64,
    }
    let mut group_locs: Vec<(i64, Vec<ChunkLoc>)> = Vec::new();

    for group in &groups {
        let mut locs = Vec::new();
        for col in &group.columns {
            let start = buf.len() as i64;
            let mut dict_offset = None;
            let mut data_offset = start;
            for (i, page) in col.pages.iter().enumerate() {
                if i == 0 && col.has_dict {
                    dict_offset = Some(start);
                    data_offset = start + page.len() as i64;
                }
                buf.extend_from_slice(page);
            }
            locs.push(ChunkLoc {
                path: col.path.clone(),
                physical: col.physical,
                codec: col.codec,
                num_values: col.num_values,
                dict_offset,
                data_offset,
                total_size: buf.len() as i64 - start,
            });
        }
        group_locs.push((group.num_rows, locs));
    }

    // footer metadata
    let mut w = ThriftWriter::default();
    w.field_i32(1, 1); // version
    w.field_list(2, 12, schema.len());
    for el in &schema {
        let inner = write_schema_element(el);
        w.element_struct(inner);
    }
    let num_rows: i64 = group_locs.iter().map(|(n, _)| *n).sum();
    w.field_i64(3, num_rows);
    w.field_list(4, 12, group_locs.len());
    for (group_rows, locs) in &group_locs {
        let mut rg = ThriftWriter::default();
        rg.field_list(1, 12, locs.len());
        for loc in locs {
            let mut cc = ThriftWriter::default();
            cc.field_i64(2, loc.data_offset);
            let mut cm = cc.field_struct(3);
            cm.field_i32(1, loc.physical);
            cm.field_list(2, 5, 1);
            cm.zig_zag(ENC_PLAIN as i64);
            cm.field_list(3, 8, loc.path.len());
            for part in &loc.path {
                cm.vlq(part.len() as u64);
                cm.out.extend_from_slice(part.as_bytes());
            }
            cm.field_i32(4, loc.codec);
            cm.field_i64(5, loc.num_values);
            cm.field_i64(6, loc.total_size);
            cm.field_i64(7, loc.total_size);
            cm.field_i64(9, loc.data_offset);
            if let Some(dict) = loc.dict_offset {
                cm.field_i64(11, dict);
            }
            cc.nested(cm);
            rg.element_struct(cc);
        }
        let total: i64 = locs.iter().map(|l| l.total_size).sum();
        rg.field_i64(2, total);
        rg.field_i64(3, *group_rows);
        w.element_struct(rg);
    }
    let metadata = w.stop();

    buf.extend_from_slice(&metadata);
    buf.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    buf.extend_from_slice(b"PAR1");
    Bytes::from(buf)
}
