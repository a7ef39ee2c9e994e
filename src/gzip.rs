//! Gzip stream inflater: adapts a pull-based [`Tokenizer`] into a lazy byte sequence of
//! decompressed data.
//!
//! Rather than hand-rolling the push/pull coupling between "read more compressed bytes" and
//! "the decompressor has more output", this reuses `async-compression`'s
//! `GzipDecoder<BufReader<R>>` and turns the result into a `Stream` with
//! `tokio_util::io::ReaderStream`.

use std::sync::{Arc, Mutex};

use async_compression::tokio::bufread::GzipDecoder;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use crate::error::{Result, SZipError};
use crate::tokenizer::Tokenizer;

/// Wraps a tokenizer into a lazy, decompressed byte sequence.
pub struct GzipInflater<T> {
    tokenizer: T,
}

impl<T: Tokenizer + Unpin + Send + 'static> GzipInflater<T> {
    /// Construct an inflater over a tokenizer positioned at the start of a gzip member.
    pub fn new(tokenizer: T) -> Self {
        Self { tokenizer }
    }

    /// Produce the lazy decompressed byte sequence. A pump task drains the tokenizer into one
    /// end of a `tokio::io::duplex` pipe; `GzipDecoder` reads from the other end, which gives it
    /// the plain `AsyncRead` it expects without the engine's async [`Tokenizer`] trait having to
    /// implement `AsyncRead` itself.
    ///
    /// A tokenizer read failure is recorded in `last_error` rather than just dropping the duplex
    /// writer, and the stream joins the pump task before ever reporting a terminal item (`None`
    /// or `Err`) so that a real I/O error is never lost to a race against the decoder's own
    /// end-of-member detection, and is always surfaced as `SZipError::Io` rather than a generic
    /// `DecompressionFailed` manufactured from the decoder's resulting truncation.
    pub fn inflate(mut self) -> impl Stream<Item = Result<Bytes>> {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        let last_error: Arc<Mutex<Option<SZipError>>> = Arc::new(Mutex::new(None));
        let pump_error = Arc::clone(&last_error);
        let pump: JoinHandle<()> = tokio::spawn(async move {
            let mut scratch = [0u8; 64 * 1024];
            loop {
                match self.tokenizer.read(&mut scratch).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if writer.write_all(&scratch[..n]).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        *pump_error.lock().unwrap() = Some(e);
                        break;
                    }
                }
            }
        });

        let decoder = GzipDecoder::new(BufReader::new(reader));
        let inner = ReaderStream::new(decoder);

        stream::unfold(
            (inner, Some(pump), last_error, false),
            |(mut inner, mut pump, last_error, done)| async move {
                if done {
                    return None;
                }
                match inner.next().await {
                    Some(Ok(bytes)) => Some((Ok(bytes), (inner, pump, last_error, false))),
                    Some(Err(e)) => {
                        join_pump(&mut pump).await;
                        let tokenizer_err = last_error.lock().unwrap().take();
                        let final_err = tokenizer_err.unwrap_or_else(|| map_reader_error(e));
                        Some((Err(final_err), (inner, pump, last_error, true)))
                    }
                    None => {
                        join_pump(&mut pump).await;
                        match last_error.lock().unwrap().take() {
                            Some(e) => Some((Err(e), (inner, pump, last_error, true))),
                            None => None,
                        }
                    }
                }
            },
        )
    }
}

/// Await the pump task's completion exactly once, so any error it recorded is visible before the
/// stream reports its own terminal item.
async fn join_pump(pump: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = pump.take() {
        let _ = handle.await;
    }
}

/// Map an error surfaced by `GzipDecoder`/`ReaderStream` itself (not a tokenizer read failure) to
/// the crate's error vocabulary.
fn map_reader_error(e: std::io::Error) -> SZipError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof || e.kind() == std::io::ErrorKind::InvalidData
    {
        SZipError::DecompressionFailed(e.to_string())
    } else {
        SZipError::Io(e)
    }
}
