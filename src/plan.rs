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

//! The query planner: from file metadata and a requested row range to the
//! byte ranges a read must fetch, grouped by row group.
//!
//! Planning up front keeps IO deterministic: the byte source sees exactly
//! the ranges the plan emits, in plan order, and nothing else.

use crate::errors::{ParquetError, Result};
use crate::file::metadata::{FileMetaData, RowGroupMetaData};

/// Column ranges closer together than this are fetched as one request.
const AGGREGATE_FETCH_LIMIT: u64 = 1 << 25; // 32 MiB

/// A half-open byte range `[start, end)` within the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte of the range.
    pub start: u64,
    /// One past the last byte of the range.
    pub end: u64,
}

impl ByteRange {
    /// Creates the range `[start, end)`.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// The per-row-group portion of a [`QueryPlan`].
#[derive(Clone, Debug)]
pub struct GroupPlan {
    /// Index of the row group within the file.
    pub row_group: usize,
    /// One byte range per column chunk, in column order.
    pub ranges: Vec<ByteRange>,
    /// Absolute row index of the group's first row.
    pub group_start: u64,
    /// Number of rows in the group.
    pub group_rows: u64,
    /// First selected row, relative to the group.
    pub select_start: u64,
    /// One past the last selected row, relative to the group.
    pub select_end: u64,
}

/// Byte ranges to fetch for a read, and how they map onto row groups.
#[derive(Clone, Debug)]
pub struct QueryPlan {
    /// Ranges to prefetch, in plan order. Nearby column ranges within a row
    /// group are merged into one fetch.
    pub fetches: Vec<ByteRange>,
    /// Per-row-group plans for groups overlapping the requested rows.
    pub groups: Vec<GroupPlan>,
}

/// Plans the fetches needed to read rows `[row_start, row_end)`.
///
/// Row groups that do not overlap the requested range are not planned and
/// none of their bytes are fetched. Column chunks that point at external
/// files are rejected.
pub fn plan_read(metadata: &FileMetaData, row_start: u64, row_end: u64) -> Result<QueryPlan> {
    let mut fetches = Vec::new();
    let mut groups = Vec::new();

    let mut group_start = 0u64;
    for (index, row_group) in metadata.row_groups.iter().enumerate() {
        let group_rows = row_group.num_rows.max(0) as u64;
        let overlaps = group_start < row_end && group_start + group_rows > row_start;
        if overlaps && group_rows > 0 {
            let ranges = column_ranges(row_group)?;

            let min_start = ranges.iter().map(|r| r.start).min().unwrap_or(0);
            let max_end = ranges.iter().map(|r| r.end).max().unwrap_or(0);
            if max_end - min_start < AGGREGATE_FETCH_LIMIT {
                fetches.push(ByteRange::new(min_start, max_end));
            } else {
                fetches.extend_from_slice(&ranges);
            }

            groups.push(GroupPlan {
                row_group: index,
                ranges,
                group_start,
                group_rows,
                select_start: row_start.saturating_sub(group_start),
                select_end: (row_end - group_start).min(group_rows),
            });
        }
        group_start += group_rows;
    }

    log::debug!(
        "planned {} fetches over {} row groups for rows [{}, {})",
        fetches.len(),
        groups.len(),
        row_start,
        row_end
    );
    Ok(QueryPlan { fetches, groups })
}

fn column_ranges(row_group: &RowGroupMetaData) -> Result<Vec<ByteRange>> {
    row_group
        .columns
        .iter()
        .map(|column| {
            if let Some(path) = &column.file_path {
                return Err(ParquetError::ExternalFile(path.clone()));
            }
            let meta = column
                .meta_data
                .as_ref()
                .ok_or_else(|| general_err!("Column chunk is missing metadata"))?;
            Ok(ByteRange::new(
                meta.start_offset().max(0) as u64,
                meta.end_offset().max(0) as u64,
            ))
        })
        .collect()
}
