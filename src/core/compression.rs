//! Deflate compression for dataset payloads.
//!
//! Each chunk is one zlib stream, as written by the HDF5 deflate filter.
//! The reader always knows how long the inflated chunk must be.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Compress data using zlib at the given level (clamped to 0-9).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Largest expansion a deflate stream can achieve.
pub const MAX_DEFLATE_RATIO: usize = 1032;

/// Decompress a zlib stream that must expand to exactly `expected_len` bytes.
///
/// Output beyond `expected_len` is never buffered, and the initial
/// allocation is bounded by what `data` could possibly expand to.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let limit = data.len().saturating_mul(MAX_DEFLATE_RATIO).saturating_add(64);
    let mut decoder = ZlibDecoder::new(data).take((expected_len as u64).saturating_add(1));
    let mut decompressed = Vec::with_capacity(expected_len.min(limit));
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::invalid(format!("corrupt deflate stream: {e}")))?;

    if decompressed.len() != expected_len {
        return Err(Error::invalid(format!(
            "deflate stream expanded to {} bytes, expected {}",
            decompressed.len(),
            expected_len
        )));
    }
    Ok(decompressed)
}
