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

//! Random-access byte sources and the prefetch buffer that serves planned
//! reads from them.

use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::errors::{ParquetError, Result};
use crate::plan::ByteRange;

/// A source of bytes that supports random-access range reads.
///
/// The total size must be known up front; reads may suspend. An HTTP
/// implementation would issue `Range` requests here, downgrading to a cached
/// full-body read when the server ignores the header.
///
/// An implementation is provided for in-memory [`Bytes`].
pub trait ByteSource: Send + Sync {
    /// Total size of the underlying object in bytes.
    fn byte_length(&self) -> u64;

    /// Returns bytes `[range.start, range.end)`. `range.end` must not exceed
    /// [`Self::byte_length`].
    fn fetch(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes>>;
}

impl ByteSource for Bytes {
    fn byte_length(&self) -> u64 {
        self.len() as u64
    }

    fn fetch(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes>> {
        let result = if range.end > self.len() as u64 || range.start > range.end {
            Err(general_err!(
                "Byte range [{}, {}) out of bounds for source of {} bytes",
                range.start,
                range.end,
                self.len()
            ))
        } else {
            Ok(self.slice(range.start as usize..range.end as usize))
        };
        futures::future::ready(result).boxed()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    fn byte_length(&self) -> u64 {
        self.as_ref().byte_length()
    }

    fn fetch(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes>> {
        self.as_ref().fetch(range)
    }
}

/// Fetches one planned range, validating the source honours its contract.
async fn fetch_range(source: Arc<dyn ByteSource>, range: ByteRange) -> Result<Bytes> {
    let bytes = source.fetch(range.start..range.end).await?;
    if bytes.len() as u64 != range.len() {
        return Err(general_err!(
            "Source returned {} bytes for a range of {}",
            bytes.len(),
            range.len()
        ));
    }
    Ok(bytes)
}

type SharedFetch = Shared<BoxFuture<'static, Result<Bytes, Arc<ParquetError>>>>;

/// Serves sub-ranges of a fixed set of planned byte ranges.
///
/// Each planned range is backed by a memoised future: the underlying fetch
/// is issued the first time any slice inside it is requested, concurrent
/// requests share the in-flight read, and the result is cached for the
/// lifetime of the buffer. The cache belongs to one read operation and is
/// never shared across reads.
pub struct Prefetch {
    ranges: Vec<(ByteRange, SharedFetch)>,
}

impl Prefetch {
    /// Creates a prefetch buffer over `ranges` of `source`.
    pub fn new(source: Arc<dyn ByteSource>, ranges: &[ByteRange]) -> Self {
        let ranges = ranges
            .iter()
            .map(|&range| {
                let source = source.clone();
                let fetch = async move { fetch_range(source, range).await.map_err(Arc::new) }
                    .boxed()
                    .shared();
                (range, fetch)
            })
            .collect();
        Self { ranges }
    }

    /// Returns bytes `[start, end)`, served from the covering planned range.
    ///
    /// Fails with [`ParquetError::PrefetchMiss`] when no planned range covers
    /// the request; that always indicates a planner bug, not bad input.
    pub async fn slice(&self, start: u64, end: u64) -> Result<Bytes> {
        let wanted = ByteRange::new(start, end);
        let (range, fetch) = self
            .ranges
            .iter()
            .find(|(range, _)| range.contains(&wanted))
            .ok_or(ParquetError::PrefetchMiss { start, end })?;

        let bytes = fetch
            .clone()
            .await
            .map_err(|e| ParquetError::Source(Box::new(e)))?;
        Ok(bytes.slice((start - range.start) as usize..(end - range.start) as usize))
    }
}
