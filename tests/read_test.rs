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

//! End-to-end reads of in-memory Parquet files.

mod common;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::executor::block_on;

use common::*;
use parquet_decode::{
    read_arrays, read_metadata, read_objects, ReadOptions, Value,
};

/// A file with one INT64 column `v` holding `values`, split into row groups
/// of `rows_per_group`.
fn int64_file(values: &[i64], rows_per_group: usize) -> Bytes {
    let schema = vec![El::root(1), El::leaf("v", REQUIRED, TYPE_INT64)];
    let groups = values
        .chunks(rows_per_group)
        .map(|chunk| Group {
            num_rows: chunk.len() as i64,
            columns: vec![Col {
                path: vec!["v"],
                physical: TYPE_INT64,
                codec: CODEC_UNCOMPRESSED,
                num_values: chunk.len() as i64,
                pages: vec![data_page_v1(
                    ENC_PLAIN,
                    chunk.len() as i32,
                    &plain_i64(chunk),
                    None,
                )],
                has_dict: false,
            }],
        })
        .collect();
    build_file(schema, groups)
}

fn int_rows(rows: &[Value], column: &str) -> Vec<i64> {
    rows.iter()
        .map(|row| match row.field(column) {
            Some(Value::Int(v)) => *v,
            other => panic!("unexpected {column}: {other:?}"),
        })
        .collect()
}

#[test]
fn test_read_objects_across_row_groups() {
    let values: Vec<i64> = (1..=15).collect();
    let file = int64_file(&values, 4);

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(rows.len(), 15);
    assert_eq!(int_rows(&rows, "v"), values);
}

#[test]
fn test_read_metadata_surface() {
    let file = int64_file(&[1, 2, 3, 4, 5], 2);
    let metadata = block_on(read_metadata(&file)).unwrap();
    assert_eq!(metadata.num_rows, 5);
    assert_eq!(metadata.row_groups.len(), 3);
    assert_eq!(metadata.schema.len(), 2);
    assert_eq!(metadata.version, 1);
    let meta = metadata.row_groups[0].columns[0].meta_data.as_ref().unwrap();
    assert_eq!(meta.path_in_schema, ["v"]);

    // reusing the metadata skips the footer refetch
    let rows = block_on(read_objects(
        ReadOptions::new(file).with_metadata(Arc::new(metadata)),
    ))
    .unwrap();
    assert_eq!(rows.len(), 5);
}

#[test]
fn test_row_range_selection() {
    let values: Vec<i64> = (1..=15).collect();
    let file = int64_file(&values, 4);

    let rows = block_on(read_objects(ReadOptions::new(file).with_row_range(5, 11))).unwrap();
    assert_eq!(int_rows(&rows, "v"), (6..=11).collect::<Vec<_>>());
}

#[test]
fn test_row_range_clamps_to_file() {
    let file = int64_file(&[1, 2, 3], 3);
    let rows = block_on(read_objects(ReadOptions::new(file).with_row_range(2, 100))).unwrap();
    assert_eq!(int_rows(&rows, "v"), [3]);
}

#[test]
fn test_empty_row_range() {
    let file = int64_file(&[1, 2, 3], 3);
    let rows = block_on(read_objects(ReadOptions::new(file).with_row_range(2, 2))).unwrap();
    assert!(rows.is_empty());
}

fn two_column_file() -> Bytes {
    let schema = vec![
        El::root(2),
        El::leaf("a", REQUIRED, TYPE_INT64),
        El::leaf("b", REQUIRED, TYPE_BYTE_ARRAY).converted(CTYPE_UTF8),
    ];
    let groups = vec![Group {
        num_rows: 3,
        columns: vec![
            Col {
                path: vec!["a"],
                physical: TYPE_INT64,
                codec: CODEC_UNCOMPRESSED,
                num_values: 3,
                pages: vec![data_page_v1(ENC_PLAIN, 3, &plain_i64(&[1, 2, 3]), None)],
                has_dict: false,
            },
            Col {
                path: vec!["b"],
                physical: TYPE_BYTE_ARRAY,
                codec: CODEC_UNCOMPRESSED,
                num_values: 3,
                pages: vec![data_page_v1(
                    ENC_PLAIN,
                    3,
                    &plain_byte_array(&[b"x", b"y", b"z"]),
                    None,
                )],
                has_dict: false,
            },
        ],
    }];
    build_file(schema, groups)
}

#[test]
fn test_column_selection() {
    let file = two_column_file();

    let rows = block_on(read_objects(ReadOptions::new(file.clone()))).unwrap();
    assert_eq!(rows[0].field("a"), Some(&Value::Int(1)));
    assert_eq!(rows[0].field("b"), Some(&Value::text("x")));

    let rows =
        block_on(read_objects(ReadOptions::new(file).with_columns(["b"]))).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].field("b"), Some(&Value::text("z")));
    assert_eq!(rows[2].field("a"), None);
}

#[test]
fn test_read_arrays_positional() {
    let file = two_column_file();
    let rows = block_on(read_arrays(ReadOptions::new(file))).unwrap();
    assert_eq!(
        rows[1],
        Value::List(vec![Value::Int(2), Value::text("y")])
    );
}

#[test]
fn test_optional_column_with_nulls() {
    let schema = vec![El::root(1), El::leaf("x", OPTIONAL, TYPE_INT32)];
    let mut payload = levels_v1(&[1, 0, 1], 1);
    payload.extend_from_slice(&plain_i32(&[7, 9]));
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 3,
            columns: vec![Col {
                path: vec!["x"],
                physical: TYPE_INT32,
                codec: CODEC_UNCOMPRESSED,
                num_values: 3,
                pages: vec![data_page_v1(ENC_PLAIN, 3, &payload, None)],
                has_dict: false,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(rows[0].field("x"), Some(&Value::Int(7)));
    assert_eq!(rows[1].field("x"), Some(&Value::Null));
    assert_eq!(rows[2].field("x"), Some(&Value::Int(9)));
}

#[test]
fn test_dictionary_encoded_strings() {
    let schema = vec![
        El::root(1),
        El::leaf("s", REQUIRED, TYPE_BYTE_ARRAY).converted(CTYPE_UTF8),
    ];
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 4,
            columns: vec![Col {
                path: vec!["s"],
                physical: TYPE_BYTE_ARRAY,
                codec: CODEC_UNCOMPRESSED,
                num_values: 4,
                pages: vec![
                    dictionary_page(2, &plain_byte_array(&[b"lo", b"hi"])),
                    data_page_v1(ENC_RLE_DICTIONARY, 4, &dict_indices(&[1, 0, 0, 1], 1), None),
                ],
                has_dict: true,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    let values: Vec<&Value> = rows.iter().map(|r| r.field("s").unwrap()).collect();
    assert_eq!(
        values,
        [&Value::text("hi"), &Value::text("lo"), &Value::text("lo"), &Value::text("hi")]
    );
}

#[test]
fn test_nested_list_column() {
    // tags: optional list<string>, rows ["a","b"], null, []
    let schema = vec![
        El::root(1),
        El::group("tags", OPTIONAL, 1).converted(CTYPE_LIST),
        El::group("list", REPEATED, 1),
        El::leaf("element", OPTIONAL, TYPE_BYTE_ARRAY),
    ];
    let mut payload = levels_v1(&[0, 1, 0, 0], 1); // repetition levels
    payload.extend_from_slice(&levels_v1(&[3, 3, 0, 1], 2)); // definition levels
    payload.extend_from_slice(&plain_byte_array(&[b"a", b"b"]));
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 3,
            columns: vec![Col {
                path: vec!["tags", "list", "element"],
                physical: TYPE_BYTE_ARRAY,
                codec: CODEC_UNCOMPRESSED,
                num_values: 4,
                pages: vec![data_page_v1(ENC_PLAIN, 4, &payload, None)],
                has_dict: false,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].field("tags"),
        Some(&Value::List(vec![Value::text("a"), Value::text("b")]))
    );
    assert_eq!(rows[1].field("tags"), Some(&Value::Null));
    assert_eq!(rows[2].field("tags"), Some(&Value::List(vec![])));
}

#[test]
fn test_data_page_v2() {
    let schema = vec![El::root(1), El::leaf("x", OPTIONAL, TYPE_INT64)];
    let page = data_page_v2(
        3,
        1,
        3,
        ENC_PLAIN,
        &[],
        &levels_v2(&[1, 0, 1], 1),
        &plain_i64(&[5, 6]),
    );
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 3,
            columns: vec![Col {
                path: vec!["x"],
                physical: TYPE_INT64,
                codec: CODEC_UNCOMPRESSED,
                num_values: 3,
                pages: vec![page],
                has_dict: false,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(rows[0].field("x"), Some(&Value::Int(5)));
    assert_eq!(rows[1].field("x"), Some(&Value::Null));
    assert_eq!(rows[2].field("x"), Some(&Value::Int(6)));
}

#[test]
#[cfg(feature = "snap")]
fn test_snappy_compressed_pages() {
    let payload = plain_i64(&[10, 20, 30]);
    let compressed = snap::raw::Encoder::new().compress_vec(&payload).unwrap();
    let schema = vec![El::root(1), El::leaf("v", REQUIRED, TYPE_INT64)];
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 3,
            columns: vec![Col {
                path: vec!["v"],
                physical: TYPE_INT64,
                codec: CODEC_SNAPPY,
                num_values: 3,
                pages: vec![data_page_v1(ENC_PLAIN, 3, &payload, Some(&compressed))],
                has_dict: false,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(int_rows(&rows, "v"), [10, 20, 30]);
}

#[test]
fn test_multiple_pages_per_chunk() {
    let schema = vec![El::root(1), El::leaf("v", REQUIRED, TYPE_INT64)];
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 5,
            columns: vec![Col {
                path: vec!["v"],
                physical: TYPE_INT64,
                codec: CODEC_UNCOMPRESSED,
                num_values: 5,
                pages: vec![
                    data_page_v1(ENC_PLAIN, 3, &plain_i64(&[1, 2, 3]), None),
                    data_page_v1(ENC_PLAIN, 2, &plain_i64(&[4, 5]), None),
                ],
                has_dict: false,
            }],
        }],
    );

    let rows = block_on(read_objects(ReadOptions::new(file))).unwrap();
    assert_eq!(int_rows(&rows, "v"), [1, 2, 3, 4, 5]);
}

#[test]
fn test_chunk_events() {
    let values: Vec<i64> = (1..=10).collect();
    let file = int64_file(&values, 5);

    let events: Arc<Mutex<Vec<(String, u64, u64, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    let options = ReadOptions::new(file).on_chunk(move |event| {
        seen.lock().unwrap().push((
            event.column.to_string(),
            event.row_start,
            event.row_end,
            event.rows.len(),
        ));
    });
    block_on(read_objects(options)).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ("v".to_string(), 0, 5, 5));
    assert_eq!(events[1], ("v".to_string(), 5, 10, 5));
}

#[test]
fn test_page_events_increasing_row_order() {
    let schema = vec![El::root(1), El::leaf("v", REQUIRED, TYPE_INT64)];
    let file = build_file(
        schema,
        vec![Group {
            num_rows: 4,
            columns: vec![Col {
                path: vec!["v"],
                physical: TYPE_INT64,
                codec: CODEC_UNCOMPRESSED,
                num_values: 4,
                pages: vec![
                    data_page_v1(ENC_PLAIN, 2, &plain_i64(&[1, 2]), None),
                    data_page_v1(ENC_PLAIN, 2, &plain_i64(&[3, 4]), None),
                ],
                has_dict: false,
            }],
        }],
    );

    let starts: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = starts.clone();
    let options = ReadOptions::new(file).on_page(move |event| {
        seen.lock().unwrap().push(event.row_start);
    });
    block_on(read_objects(options)).unwrap();

    let starts = starts.lock().unwrap();
    assert_eq!(&*starts, &[0, 2]);
}

#[test]
fn test_corrupt_files() {
    use parquet_decode::ParquetError;

    let err = block_on(read_objects(ReadOptions::new(Bytes::from_static(b"PAR"))))
        .unwrap_err();
    assert!(matches!(err, ParquetError::ShortFile));

    let err = block_on(read_objects(ReadOptions::new(Bytes::from_static(
        b"PAR1\x00\x00\x00\x00PAR2",
    ))))
    .unwrap_err();
    assert!(matches!(err, ParquetError::BadMagic));
}
