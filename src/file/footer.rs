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

//! Reads the file footer and decodes [`FileMetaData`].
//!
//! # Layout of a Parquet file
//! ```text
//! +---------------------------+-----+---+
//! |      Rest of file         |  B  | A |
//! +---------------------------+-----+---+
//! ```
//! where
//! * `A`: 8-byte footer holding the metadata length and the `PAR1` magic.
//! * `B`: Thrift compact protocol encoded metadata.

use crate::errors::{ParquetError, Result};
use crate::file::metadata::{parse_file_metadata, FileMetaData};
use crate::file::{FOOTER_SIZE, PARQUET_MAGIC};
use crate::source::ByteSource;
use crate::thrift::ThriftCompactReader;

/// How many trailing bytes [`read_metadata`] fetches before it knows the
/// metadata length. One extra round trip is needed only for files whose
/// metadata exceeds this.
pub const DEFAULT_FOOTER_READ_SIZE: u64 = 512 * 1024;

/// Decodes the 8-byte footer trailer, returning the metadata length.
pub fn decode_footer(footer: &[u8; FOOTER_SIZE as usize]) -> Result<u64> {
    if footer[4..] != PARQUET_MAGIC {
        return Err(ParquetError::BadMagic);
    }
    Ok(u32::from_le_bytes(footer[..4].try_into().unwrap()) as u64)
}

/// Decodes [`FileMetaData`] from a buffer ending with the footer trailer.
///
/// `buf` holds the last bytes of the file; typically the whole file for
/// in-memory use, or the suffix window fetched by [`read_metadata`].
pub fn decode_metadata(buf: &[u8]) -> Result<FileMetaData> {
    let len = buf.len() as u64;
    if len < FOOTER_SIZE {
        return Err(ParquetError::ShortFile);
    }
    let footer: &[u8; FOOTER_SIZE as usize] = buf[buf.len() - FOOTER_SIZE as usize..]
        .try_into()
        .unwrap();
    let metadata_len = decode_footer(footer)?;
    if metadata_len > len - FOOTER_SIZE {
        return Err(ParquetError::BadMetadataLength {
            metadata_len,
            file_len: len,
        });
    }

    let start = buf.len() - FOOTER_SIZE as usize - metadata_len as usize;
    let mut reader = ThriftCompactReader::new(&buf[start..buf.len() - FOOTER_SIZE as usize]);
    let decoded = reader.read_struct()?;
    parse_file_metadata(&decoded, metadata_len)
}

/// Reads [`FileMetaData`] from a byte source with the default suffix window.
///
/// Fetches the last [`DEFAULT_FOOTER_READ_SIZE`] bytes (or the whole file if
/// smaller), then refetches once if the metadata turns out to be larger than
/// the window.
pub async fn read_metadata<S: ByteSource + ?Sized>(source: &S) -> Result<FileMetaData> {
    read_metadata_with_fetch(source, DEFAULT_FOOTER_READ_SIZE).await
}

/// [`read_metadata`] with an explicit initial fetch size.
pub async fn read_metadata_with_fetch<S: ByteSource + ?Sized>(
    source: &S,
    initial_fetch: u64,
) -> Result<FileMetaData> {
    let file_len = source.byte_length();
    if file_len < FOOTER_SIZE {
        return Err(ParquetError::ShortFile);
    }

    let fetch_len = initial_fetch.clamp(FOOTER_SIZE, file_len);
    let suffix = source.fetch(file_len - fetch_len..file_len).await?;
    if suffix.len() as u64 != fetch_len {
        return Err(general_err!(
            "Source returned {} bytes for a range of {}",
            suffix.len(),
            fetch_len
        ));
    }

    let footer: &[u8; FOOTER_SIZE as usize] = suffix[suffix.len() - FOOTER_SIZE as usize..]
        .try_into()
        .unwrap();
    let metadata_len = decode_footer(footer)?;
    if metadata_len > file_len - FOOTER_SIZE {
        return Err(ParquetError::BadMetadataLength {
            metadata_len,
            file_len,
        });
    }

    if metadata_len + FOOTER_SIZE > fetch_len {
        // the metadata is larger than the suffix window; fetch it exactly
        log::warn!(
            "parquet metadata of {metadata_len} bytes exceeds initial fetch of {fetch_len}; refetching"
        );
        let start = file_len - FOOTER_SIZE - metadata_len;
        let buf = source.fetch(start..file_len).await?;
        return decode_metadata(&buf);
    }

    decode_metadata(&suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::executor::block_on;

    #[test]
    fn test_short_file() {
        assert!(matches!(
            decode_metadata(&[]),
            Err(ParquetError::ShortFile)
        ));
        assert!(matches!(
            decode_metadata(&[b'P', b'A', b'R', b'1']),
            Err(ParquetError::ShortFile)
        ));
        let source = Bytes::from_static(b"PAR1");
        assert!(matches!(
            block_on(read_metadata(&source)),
            Err(ParquetError::ShortFile)
        ));
    }

    #[test]
    fn test_bad_magic() {
        // off by one bit in the final byte
        let buf = [0u8, 0, 0, 0, b'P', b'A', b'R', b'1' ^ 0x01];
        assert!(matches!(
            decode_metadata(&buf),
            Err(ParquetError::BadMagic)
        ));
    }

    #[test]
    fn test_bad_metadata_length() {
        let buf = [255u8, 0, 0, 0, b'P', b'A', b'R', b'1'];
        match decode_metadata(&buf) {
            Err(ParquetError::BadMetadataLength {
                metadata_len: 255,
                file_len: 8,
            }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_footer() {
        let buf = [16u8, 0, 0, 0, b'P', b'A', b'R', b'1'];
        assert_eq!(decode_footer(&buf).unwrap(), 16);
    }
}
