//! The byte-source abstraction the engine reads through.
//!
//! `Tokenizer` is the external contract: something that can `peek`, `read`, `ignore`, and
//! optionally seek. The engine never assumes a particular transport — [`FileTokenizer`] wraps a
//! `tokio::fs::File` (random access), [`StreamTokenizer`] wraps an arbitrary `AsyncRead`
//! (sequential only, e.g. an HTTP response body). Callers targeting a cloud object store
//! implement the same trait over their own range-request client.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, BufReader};

use crate::error::{eof_error, Result, SZipError};

/// A fixed-length on-disk record the codec knows how to decode from a byte slice.
///
/// Implemented by the record types in [`crate::codec`]; lets `Tokenizer::read_token`/
/// `peek_token` stay generic instead of duplicating the read-then-decode dance per record type.
pub trait Token: Sized {
    /// Length in bytes of the fixed portion of this record (excludes variable-length tails).
    const LEN: usize;

    /// Decode from a slice of exactly `LEN` bytes.
    fn decode(buf: &[u8]) -> Result<Self>;
}

/// A byte-oriented input source the engine can read sequentially and, if it supports random
/// access, seek around in.
///
/// All operations are asynchronous so the same engine code runs against local files, HTTP
/// bodies, and in-memory buffers alike. `Tokenizer` is generic-method-friendly (`read_token` is
/// generic over `T: Token`), so the engine is parameterized as `ZipEngine<T: Tokenizer>` rather
/// than going through `dyn Tokenizer`.
#[async_trait]
pub trait Tokenizer: Send {
    /// Fill up to `buf.len()` bytes without advancing the read position. Returns the number of
    /// bytes actually peeked (may be less than `buf.len()` at end of stream — this is not an
    /// error).
    async fn peek(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fill up to `buf.len()` bytes, advancing the read position by the amount read. Returns the
    /// number of bytes actually read (may be less than `buf.len()` at end of stream).
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Current byte offset from the start of the stream.
    fn position(&self) -> u64;

    /// Whether this tokenizer supports [`Tokenizer::set_position`] and reports a real
    /// [`Tokenizer::file_size`].
    fn supports_random_access(&self) -> bool;

    /// Jump to an absolute byte offset. Errors on a tokenizer that doesn't support random
    /// access.
    async fn set_position(&mut self, pos: u64) -> Result<()>;

    /// Total size of the underlying stream, if known (random-access tokenizers only).
    fn file_size(&self) -> Option<u64> {
        None
    }

    /// Read exactly `buf.len()` bytes or fail with an end-of-stream error
    /// (`SZipError::Io` wrapping `io::ErrorKind::UnexpectedEof`).
    async fn read_exact_at(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(eof_error());
            }
            filled += n;
        }
        Ok(())
    }

    /// Advance the read position by `n` bytes without yielding them to the caller. The default
    /// implementation reads and discards through a stack buffer; random-access tokenizers
    /// override this with a cheap seek.
    async fn ignore(&mut self, mut n: u64) -> Result<()> {
        let mut scratch = [0u8; 8192];
        while n > 0 {
            let chunk = n.min(scratch.len() as u64) as usize;
            let read = self.read(&mut scratch[..chunk]).await?;
            if read == 0 {
                return Err(eof_error());
            }
            n -= read as u64;
        }
        Ok(())
    }

    /// Read and decode a fixed-length token at the current position, advancing past it.
    async fn read_token<T: Token + Send>(&mut self) -> Result<T> {
        let mut buf = vec![0u8; T::LEN];
        self.read_exact_at(&mut buf).await?;
        T::decode(&buf)
    }

    /// Peek and decode a fixed-length token at the current position without advancing.
    async fn peek_token<T: Token + Send>(&mut self) -> Result<T> {
        let mut buf = vec![0u8; T::LEN];
        let n = self.peek(&mut buf).await?;
        if n < buf.len() {
            return Err(eof_error());
        }
        T::decode(&buf)
    }

    /// Read `len` bytes and decode them as UTF-8.
    async fn read_utf8(&mut self, len: usize) -> Result<String> {
        let mut buf = vec![0u8; len];
        self.read_exact_at(&mut buf).await?;
        String::from_utf8(buf).map_err(|e| SZipError::InvalidFormat(e.to_string()))
    }
}

/// Random-access tokenizer over anything `AsyncRead + AsyncSeek` (a `tokio::fs::File`, a
/// `std::io::Cursor` wrapped for async use, etc).
pub struct FileTokenizer<R> {
    inner: BufReader<R>,
    position: u64,
    size: u64,
}

impl FileTokenizer<File> {
    /// Open `path` and wrap it in a random-access tokenizer.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).await?;
        Self::new(file).await
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin + Send> FileTokenizer<R> {
    /// Wrap an already-open random-access reader, probing its size via a seek-to-end.
    pub async fn new(mut reader: R) -> Result<Self> {
        let size = reader.seek(std::io::SeekFrom::End(0)).await?;
        reader.seek(std::io::SeekFrom::Start(0)).await?;
        Ok(Self {
            inner: BufReader::new(reader),
            position: 0,
            size,
        })
    }
}

#[async_trait]
impl<R: AsyncRead + AsyncSeek + Unpin + Send> Tokenizer for FileTokenizer<R> {
    async fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        let start = self.position;
        let n = self.read(buf).await?;
        self.set_position(start).await?;
        Ok(n)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf).await?;
        self.position += n as u64;
        Ok(n)
    }

    async fn ignore(&mut self, n: u64) -> Result<()> {
        self.set_position(self.position + n).await
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn file_size(&self) -> Option<u64> {
        Some(self.size)
    }

    async fn set_position(&mut self, pos: u64) -> Result<()> {
        // tokio's `BufReader::poll_seek` discards any buffered-but-unconsumed bytes before
        // seeking the inner reader, so there is no stale-buffer hazard here.
        self.inner.seek(std::io::SeekFrom::Start(pos)).await?;
        self.position = pos;
        Ok(())
    }
}

/// Sequential-only tokenizer over any `AsyncRead` source (an HTTP body, a pipe, a one-shot
/// stream). `set_position` always fails; `file_size` is always `None`. Peeking is backed by a
/// small internal lookahead buffer so `peek` can be satisfied without consuming the source.
pub struct StreamTokenizer<R> {
    inner: R,
    lookahead: Vec<u8>,
    consumed: usize,
    position: u64,
}

impl<R: AsyncRead + Unpin + Send> StreamTokenizer<R> {
    /// Wrap a sequential async reader.
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader,
            lookahead: Vec::new(),
            consumed: 0,
            position: 0,
        }
    }

    /// Pull from the source until at least `want` bytes are buffered or the source is
    /// exhausted.
    async fn ensure_lookahead(&mut self, want: usize) -> Result<()> {
        let mut chunk = [0u8; 8192];
        while self.lookahead.len() - self.consumed < want {
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.lookahead.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn compact(&mut self) {
        if self.consumed > 64 * 1024 {
            self.lookahead.drain(..self.consumed);
            self.consumed = 0;
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> Tokenizer for StreamTokenizer<R> {
    async fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_lookahead(buf.len()).await?;
        let avail = &self.lookahead[self.consumed..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        Ok(n)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_lookahead(buf.len()).await?;
        let avail = self.lookahead.len() - self.consumed;
        let n = avail.min(buf.len());
        buf[..n].copy_from_slice(&self.lookahead[self.consumed..self.consumed + n]);
        self.consumed += n;
        self.position += n as u64;
        self.compact();
        Ok(n)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn supports_random_access(&self) -> bool {
        false
    }

    async fn set_position(&mut self, _pos: u64) -> Result<()> {
        Err(SZipError::InvalidFormat(
            "StreamTokenizer does not support random access".to_string(),
        ))
    }
}
