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

//! Page decompression.
//!
//! Built-in codecs are feature-gated; callers can also register their own
//! decompress functions per codec, which take precedence over the built-ins.
//! Every path enforces the contract that decompression produces exactly the
//! uncompressed size recorded in the page header.

use std::collections::HashMap;
use std::sync::Arc;

use crate::basic::Compression;
use crate::errors::{ParquetError, Result};

/// Decompression codec for one compression scheme.
///
/// Instances are stateful and cheap; the column reader creates one per
/// column chunk.
pub trait Codec: Send {
    /// Decompresses `input_buf` into `output_buf`, which is cleared first.
    /// The result must be exactly `uncompress_size` bytes.
    fn decompress(
        &mut self,
        input_buf: &[u8],
        output_buf: &mut Vec<u8>,
        uncompress_size: usize,
    ) -> Result<usize>;
}

/// A caller-supplied decompress function for one codec.
///
/// Receives the compressed bytes and the expected uncompressed length, and
/// must return exactly that many bytes.
pub type DecompressFn = Arc<dyn Fn(&[u8], usize) -> Result<Vec<u8>> + Send + Sync>;

/// Caller-supplied decompressors, keyed by codec.
#[derive(Clone, Default)]
pub struct Decompressors {
    map: HashMap<Compression, DecompressFn>,
}

impl Decompressors {
    /// Registers `f` for `codec`, replacing any built-in support.
    pub fn with(mut self, codec: Compression, f: DecompressFn) -> Self {
        self.map.insert(codec, f);
        self
    }

    /// The registered function for `codec`, if any.
    pub fn get(&self, codec: Compression) -> Option<&DecompressFn> {
        self.map.get(&codec)
    }
}

impl std::fmt::Debug for Decompressors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decompressors")
            .field("codecs", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn check_size(got: usize, uncompress_size: usize, codec: Compression) -> Result<usize> {
    if got != uncompress_size {
        return Err(general_err!(
            "{} decompressed {} bytes, page header says {}",
            codec,
            got,
            uncompress_size
        ));
    }
    Ok(got)
}

/// Creates the built-in [`Codec`] for `codec`.
///
/// Returns `None` for `UNCOMPRESSED`. Fails with
/// [`ParquetError::UnsupportedCodec`] when the codec has no built-in
/// implementation or its feature is disabled.
pub fn create_codec(codec: Compression) -> Result<Option<Box<dyn Codec>>> {
    match codec {
        Compression::UNCOMPRESSED => Ok(None),
        #[cfg(feature = "snap")]
        Compression::SNAPPY => Ok(Some(Box::new(SnappyCodec::new()))),
        #[cfg(feature = "flate2")]
        Compression::GZIP => Ok(Some(Box::new(GZipCodec::new()))),
        #[cfg(feature = "brotli")]
        Compression::BROTLI => Ok(Some(Box::new(BrotliCodec::new()))),
        #[cfg(feature = "lz4")]
        Compression::LZ4 => Ok(Some(Box::new(Lz4HadoopCodec::new()))),
        #[cfg(feature = "lz4")]
        Compression::LZ4_RAW => Ok(Some(Box::new(Lz4RawCodec::new()))),
        #[cfg(feature = "zstd")]
        Compression::ZSTD => Ok(Some(Box::new(ZstdCodec::new()))),
        _ => Err(ParquetError::UnsupportedCodec(codec)),
    }
}

#[cfg(feature = "snap")]
mod snappy_codec {
    use super::*;

    /// Codec for the Snappy raw block format.
    pub struct SnappyCodec {
        decoder: snap::raw::Decoder,
    }

    impl SnappyCodec {
        pub(crate) fn new() -> Self {
            Self {
                decoder: snap::raw::Decoder::new(),
            }
        }
    }

    impl Codec for SnappyCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            output_buf.clear();
            output_buf.resize(uncompress_size, 0);
            let got = self
                .decoder
                .decompress(input_buf, output_buf)
                .map_err(|e| general_err!("snappy error: {}", e))?;
            output_buf.truncate(got);
            check_size(got, uncompress_size, Compression::SNAPPY)
        }
    }
}
#[cfg(feature = "snap")]
pub use snappy_codec::SnappyCodec;

#[cfg(feature = "flate2")]
mod gzip_codec {
    use std::io::Read;

    use super::*;

    /// Codec for gzip compression.
    pub struct GZipCodec {}

    impl GZipCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for GZipCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            output_buf.clear();
            output_buf.reserve(uncompress_size);
            let mut decoder = flate2::read::MultiGzDecoder::new(input_buf);
            let got = decoder
                .read_to_end(output_buf)
                .map_err(|e| general_err!("gzip error: {}", e))?;
            check_size(got, uncompress_size, Compression::GZIP)
        }
    }
}
#[cfg(feature = "flate2")]
pub use gzip_codec::GZipCodec;

#[cfg(feature = "brotli")]
mod brotli_codec {
    use std::io::Read;

    use super::*;

    const BROTLI_DEFAULT_BUFFER_SIZE: usize = 4096;

    /// Codec for brotli compression.
    pub struct BrotliCodec {}

    impl BrotliCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for BrotliCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            output_buf.clear();
            output_buf.reserve(uncompress_size);
            let got = brotli::Decompressor::new(input_buf, BROTLI_DEFAULT_BUFFER_SIZE)
                .read_to_end(output_buf)
                .map_err(|e| general_err!("brotli error: {}", e))?;
            check_size(got, uncompress_size, Compression::BROTLI)
        }
    }
}
#[cfg(feature = "brotli")]
pub use brotli_codec::BrotliCodec;

#[cfg(feature = "lz4")]
mod lz4_codec {
    use std::io::Read;

    use super::*;

    /// Codec for the LZ4_RAW block format.
    pub struct Lz4RawCodec {}

    impl Lz4RawCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for Lz4RawCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            output_buf.clear();
            let decoded = lz4_flex::block::decompress(input_buf, uncompress_size)
                .map_err(|e| general_err!("lz4 error: {}", e))?;
            output_buf.extend_from_slice(&decoded);
            check_size(output_buf.len(), uncompress_size, Compression::LZ4_RAW)
        }
    }

    /// Codec for the deprecated LZ4 compression.
    ///
    /// Hadoop writers frame raw LZ4 blocks with big-endian
    /// (uncompressed length, compressed length) pairs; other writers use the
    /// LZ4 frame format. Try the Hadoop framing first and fall back.
    pub struct Lz4HadoopCodec {}

    impl Lz4HadoopCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    const SIZE_U32: usize = std::mem::size_of::<u32>();
    const HADOOP_PREFIX_LEN: usize = SIZE_U32 * 2;

    fn try_decompress_hadoop(input_buf: &[u8], output_buf: &mut [u8]) -> Option<usize> {
        let mut input = input_buf;
        let mut output = &mut *output_buf;
        let mut total = 0usize;
        while !input.is_empty() {
            if input.len() < HADOOP_PREFIX_LEN {
                return None;
            }
            let expected = u32::from_be_bytes(input[..SIZE_U32].try_into().unwrap()) as usize;
            let compressed =
                u32::from_be_bytes(input[SIZE_U32..HADOOP_PREFIX_LEN].try_into().unwrap()) as usize;
            input = &input[HADOOP_PREFIX_LEN..];
            if input.len() < compressed || output.len() < expected {
                return None;
            }
            let decoded = lz4_flex::block::decompress(&input[..compressed], expected).ok()?;
            if decoded.len() != expected {
                return None;
            }
            output[..expected].copy_from_slice(&decoded);
            output = &mut output[expected..];
            input = &input[compressed..];
            total += expected;
        }
        Some(total)
    }

    impl Codec for Lz4HadoopCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            output_buf.clear();
            output_buf.resize(uncompress_size, 0);
            if let Some(got) = try_decompress_hadoop(input_buf, output_buf) {
                output_buf.truncate(got);
                return check_size(got, uncompress_size, Compression::LZ4);
            }
            output_buf.clear();
            output_buf.reserve(uncompress_size);
            let got = lz4_flex::frame::FrameDecoder::new(input_buf)
                .read_to_end(output_buf)
                .map_err(|e| general_err!("lz4 error: {}", e))?;
            check_size(got, uncompress_size, Compression::LZ4)
        }
    }
}
#[cfg(feature = "lz4")]
pub use lz4_codec::{Lz4HadoopCodec, Lz4RawCodec};

#[cfg(feature = "zstd")]
mod zstd_codec {
    use super::*;

    /// Codec for Zstandard compression.
    pub struct ZstdCodec {}

    impl ZstdCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for ZstdCodec {
        fn decompress(
            &mut self,
            input_buf: &[u8],
            output_buf: &mut Vec<u8>,
            uncompress_size: usize,
        ) -> Result<usize> {
            let decoded = zstd::stream::decode_all(input_buf)
                .map_err(|e| general_err!("zstd error: {}", e))?;
            output_buf.clear();
            output_buf.extend_from_slice(&decoded);
            check_size(output_buf.len(), uncompress_size, Compression::ZSTD)
        }
    }
}
#[cfg(feature = "zstd")]
pub use zstd_codec::ZstdCodec;
