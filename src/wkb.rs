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

//! Decoder for [Well-Known Binary] geometries, used for the GEOMETRY and
//! GEOGRAPHY logical types.
//!
//! Geometries are materialised as GeoJSON-shaped records:
//! `{type: "Point", coordinates: [x, y]}` and so on.
//!
//! [Well-Known Binary]: https://libgeos.org/specifications/wkb/

use std::sync::Arc;

use crate::data_type::Value;
use crate::errors::{ParquetError, Result};

const GEOMETRY_TYPES: [&str; 7] = [
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
];

/// Z/M/ZM variants offset the geometry type by multiples of 1000.
const DIMENSION_OFFSETS: [(u32, usize); 4] = [(0, 2), (1000, 3), (2000, 3), (3000, 4)];

struct WkbReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WkbReader<'a> {
    fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| eof_err!("Unexpected end of WKB geometry"))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_u32(&mut self, big_endian: bool) -> Result<u32> {
        let bytes: [u8; 4] = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| eof_err!("Unexpected end of WKB geometry"))?
            .try_into()
            .unwrap();
        self.pos += 4;
        Ok(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn read_f64(&mut self, big_endian: bool) -> Result<f64> {
        let bytes: [u8; 8] = self
            .data
            .get(self.pos..self.pos + 8)
            .ok_or_else(|| eof_err!("Unexpected end of WKB geometry"))?
            .try_into()
            .unwrap();
        self.pos += 8;
        Ok(if big_endian {
            f64::from_be_bytes(bytes)
        } else {
            f64::from_le_bytes(bytes)
        })
    }

    fn read_position(&mut self, big_endian: bool, dims: usize) -> Result<Value> {
        let mut coords = Vec::with_capacity(dims);
        for _ in 0..dims {
            coords.push(Value::Double(self.read_f64(big_endian)?));
        }
        Ok(Value::List(coords))
    }

    fn read_ring(&mut self, big_endian: bool, dims: usize) -> Result<Value> {
        let n = self.read_u32(big_endian)? as usize;
        let mut positions = Vec::with_capacity(n.min(4096));
        for _ in 0..n {
            positions.push(self.read_position(big_endian, dims)?);
        }
        Ok(Value::List(positions))
    }

    fn read_geometry(&mut self) -> Result<Value> {
        let big_endian = match self.read_u8()? {
            0 => true,
            1 => false,
            b => return Err(general_err!("Unknown WKB byte order {}", b)),
        };
        let raw_type = self.read_u32(big_endian)?;
        let (kind, dims) = DIMENSION_OFFSETS
            .iter()
            .find_map(|&(offset, dims)| {
                let base = raw_type.checked_sub(offset)?;
                (1..=7).contains(&base).then_some((base, dims))
            })
            .ok_or_else(|| general_err!("Unknown WKB geometry type {}", raw_type))?;
        let type_name = GEOMETRY_TYPES[kind as usize - 1];

        let body = match kind {
            // Point
            1 => self.read_position(big_endian, dims)?,
            // LineString
            2 => self.read_ring(big_endian, dims)?,
            // Polygon
            3 => {
                let n = self.read_u32(big_endian)? as usize;
                let mut rings = Vec::with_capacity(n.min(4096));
                for _ in 0..n {
                    rings.push(self.read_ring(big_endian, dims)?);
                }
                Value::List(rings)
            }
            // Multi* and GeometryCollection: nested full geometries
            _ => {
                let n = self.read_u32(big_endian)? as usize;
                let mut parts = Vec::with_capacity(n.min(4096));
                for _ in 0..n {
                    parts.push(self.read_geometry()?);
                }
                Value::List(parts)
            }
        };

        if kind == 7 {
            return Ok(Value::Record(vec![
                (Arc::from("type"), Value::text(type_name)),
                (Arc::from("geometries"), body),
            ]));
        }
        // the members of a multi-geometry are bare coordinate arrays
        let coordinates = if (4..=6).contains(&kind) {
            match body {
                Value::List(parts) => Value::List(
                    parts
                        .into_iter()
                        .map(|part| match part {
                            Value::Record(fields) => fields
                                .into_iter()
                                .find(|(k, _)| k.as_ref() == "coordinates")
                                .map(|(_, v)| v)
                                .unwrap_or(Value::Null),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            }
        } else {
            body
        };

        Ok(Value::Record(vec![
            (Arc::from("type"), Value::text(type_name)),
            (Arc::from("coordinates"), coordinates),
        ]))
    }
}

/// Decodes one WKB geometry into its GeoJSON-shaped [`Value`].
pub fn decode_wkb(data: &[u8]) -> Result<Value> {
    let mut reader = WkbReader { data, pos: 0 };
    reader.read_geometry()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_little_endian() {
        let data = [
            0x01, 0x01, 0x00, 0x00, 0x00, // LE, Point
            0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x59, 0x40, // 102.0
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xe0, 0x3f, // 0.5
        ];
        let geom = decode_wkb(&data).unwrap();
        assert_eq!(geom.field("type"), Some(&Value::text("Point")));
        assert_eq!(
            geom.field("coordinates"),
            Some(&Value::List(vec![Value::Double(102.0), Value::Double(0.5)]))
        );
    }

    #[test]
    fn test_point_big_endian() {
        let mut data = vec![0x00, 0x00, 0x00, 0x00, 0x01];
        data.extend_from_slice(&1.0f64.to_be_bytes());
        data.extend_from_slice(&(-2.0f64).to_be_bytes());
        let geom = decode_wkb(&data).unwrap();
        assert_eq!(
            geom.field("coordinates"),
            Some(&Value::List(vec![Value::Double(1.0), Value::Double(-2.0)]))
        );
    }

    #[test]
    fn test_line_string() {
        let mut data = vec![0x01, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        for v in [0.0f64, 0.0, 1.0, 1.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let geom = decode_wkb(&data).unwrap();
        assert_eq!(geom.field("type"), Some(&Value::text("LineString")));
        match geom.field("coordinates") {
            Some(Value::List(points)) => assert_eq!(points.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_multi_point_flattens_members() {
        let mut data = vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x00]);
        data.extend_from_slice(&3.0f64.to_le_bytes());
        data.extend_from_slice(&4.0f64.to_le_bytes());
        let geom = decode_wkb(&data).unwrap();
        assert_eq!(geom.field("type"), Some(&Value::text("MultiPoint")));
        assert_eq!(
            geom.field("coordinates"),
            Some(&Value::List(vec![Value::List(vec![
                Value::Double(3.0),
                Value::Double(4.0)
            ])]))
        );
    }

    #[test]
    fn test_point_z() {
        // type 1001 = Point Z
        let mut data = vec![0x01, 0xe9, 0x03, 0x00, 0x00];
        for v in [1.0f64, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let geom = decode_wkb(&data).unwrap();
        match geom.field("coordinates") {
            Some(Value::List(coords)) => assert_eq!(coords.len(), 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bad_byte_order() {
        assert!(decode_wkb(&[0x07]).is_err());
    }

    #[test]
    fn test_truncated() {
        assert!(decode_wkb(&[0x01, 0x01, 0x00, 0x00, 0x00, 0x01]).is_err());
    }
}
