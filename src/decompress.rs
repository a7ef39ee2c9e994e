//! Decompression routing.
//!
//! The engine never special-cases a compression method beyond "stored vs. delegate" — it passes
//! anything other than method 0 to a [`Decompressor`]. This crate ships [`DefaultDecompressor`],
//! which routes DEFLATE through `flate2` and DEFLATE64 through the `deflate64` crate.

use std::io::Read;

use async_trait::async_trait;

use crate::error::{Result, SZipError};

/// Compression method 0: payload bytes are the decompressed bytes.
pub const METHOD_STORED: u16 = 0;
/// Compression method 8: classic DEFLATE.
pub const METHOD_DEFLATE: u16 = 8;
/// Compression method 9: "Enhanced Deflating using Deflate64(tm)".
pub const METHOD_DEFLATE64: u16 = 9;

/// External decompression contract. The engine calls this for every entry whose compression
/// method is not [`METHOD_STORED`]; it is never invoked for stored entries.
#[async_trait]
pub trait Decompressor: Send + Sync {
    /// Decompress `compressed`, interpreting it per `method`. Implementations that don't
    /// recognize `method` should return `SZipError::UnsupportedCompression`.
    async fn inflate(&self, compressed: &[u8], method: u16) -> Result<Vec<u8>>;
}

/// The decompressor this crate ships out of the box: DEFLATE via `flate2`, DEFLATE64 via the
/// `deflate64` crate. Both run synchronously over an already-fully-buffered payload — the
/// engine only calls this once an entry's compressed bytes are entirely in memory, so there is
/// no streaming benefit to making the decompression step itself asynchronous.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDecompressor;

#[async_trait]
impl Decompressor for DefaultDecompressor {
    async fn inflate(&self, compressed: &[u8], method: u16) -> Result<Vec<u8>> {
        match method {
            METHOD_DEFLATE => {
                let mut decoder = flate2::read::DeflateDecoder::new(compressed);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| SZipError::DecompressionFailed(e.to_string()))?;
                Ok(out)
            }
            METHOD_DEFLATE64 => {
                let mut decoder = deflate64::Deflate64Decoder::new(compressed);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| SZipError::DecompressionFailed(e.to_string()))?;
                Ok(out)
            }
            other => Err(SZipError::UnsupportedCompression(other)),
        }
    }
}

/// Route a payload through `decompressor`, short-circuiting stored entries without ever calling
/// it.
pub async fn decompress(
    decompressor: &dyn Decompressor,
    compressed: Vec<u8>,
    method: u16,
) -> Result<Vec<u8>> {
    if method == METHOD_STORED {
        return Ok(compressed);
    }
    decompressor.inflate(&compressed, method).await
}
