//! The stateful orchestrator: signature discovery, central-directory resolution, and the two
//! traversal strategies.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::codec::{
    self, CentralFileHeader, DataDescriptor, EndOfCentralDirectoryRecord, LocalFileHeader,
    CENTRAL_FILE_HEADER_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE, ENCRYPTED_MARKER_SIGNATURE,
    END_OF_CENTRAL_DIRECTORY_SIGNATURE, LOCAL_FILE_HEADER_SIGNATURE,
};
use crate::decompress::{self, DefaultDecompressor, Decompressor};
use crate::error::{is_eof, Result, SZipError};
use crate::tokenizer::Tokenizer;

/// Default size of the engine's reusable scratch region, used for EOCD tail scans and
/// data-descriptor signature searches (the "sync buffer").
pub const DEFAULT_SYNC_BUFFER_LEN: usize = 256 * 1024;

/// Maximum span searched backwards from the end of the stream for the EOCD signature — the
/// record itself is 22 bytes, the rest is budget for a trailing comment.
const EOCD_TAIL_SCAN_LEN: usize = 16 * 1024;

/// One entry resolved from the central directory (Path A).
#[derive(Debug, Clone)]
pub struct CentralDirectoryEntry {
    pub name: String,
    pub compression_method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub relative_offset_of_local_header: u32,
}

/// The header information handed to [`Filter::filter`], regardless of which traversal path
/// produced it.
#[derive(Debug, Clone)]
pub struct EntryHeader {
    pub name: String,
    pub compression_method: u16,
    pub uncompressed_size: u64,
    /// `None` on Path B until the trailing data descriptor (if any) has been read; central
    /// directory entries (Path A) always know this up front.
    pub compressed_size: Option<u64>,
    pub crc32: u32,
}

/// What the filter wants done with the entry it was just shown.
pub struct FilterDecision {
    /// `Some` to receive the decompressed payload; `None` to skip it as cheaply as the
    /// traversal path allows.
    pub handler: Option<Box<dyn EntryHandler>>,
    /// Stop the traversal after this entry's payload (and trailing descriptor, if any) has been
    /// fully consumed.
    pub stop: bool,
}

impl FilterDecision {
    /// Skip this entry's payload, keep going.
    pub fn ignore() -> Self {
        Self {
            handler: None,
            stop: false,
        }
    }

    /// Extract this entry's payload, keep going.
    pub fn extract(handler: Box<dyn EntryHandler>) -> Self {
        Self {
            handler: Some(handler),
            stop: false,
        }
    }

    /// Extract this entry's payload, then stop after it.
    pub fn extract_and_stop(handler: Box<dyn EntryHandler>) -> Self {
        Self {
            handler: Some(handler),
            stop: true,
        }
    }
}

/// Invoked once per entry, before payload consumption.
#[async_trait]
pub trait Filter: Send {
    async fn filter(&mut self, header: &EntryHeader) -> FilterDecision;
}

/// Blanket impl so a plain closure can be passed directly to [`ZipEngine::unzip`] without a
/// dedicated struct.
#[async_trait]
impl<F> Filter for F
where
    F: FnMut(&EntryHeader) -> FilterDecision + Send,
{
    async fn filter(&mut self, header: &EntryHeader) -> FilterDecision {
        (self)(header)
    }
}

/// Receives an entry's fully decompressed payload.
#[async_trait]
pub trait EntryHandler: Send {
    async fn handle(&mut self, data: Bytes) -> Result<()>;
}

/// Blanket impl so a plain `FnMut(Bytes) -> Result<()>` closure can be boxed up as a handler
/// without a dedicated struct.
#[async_trait]
impl<F> EntryHandler for F
where
    F: FnMut(Bytes) -> Result<()> + Send,
{
    async fn handle(&mut self, data: Bytes) -> Result<()> {
        (self)(data)
    }
}

/// The ZIP parsing and extraction engine. Generic over any [`Tokenizer`] so the same
/// traversal logic runs against local files, HTTP bodies, or in-memory buffers.
pub struct ZipEngine<T: Tokenizer> {
    tokenizer: T,
    sync_buffer: Vec<u8>,
    decompressor: Box<dyn Decompressor>,
}

impl<T: Tokenizer> ZipEngine<T> {
    /// Construct an engine with the default 256 KiB sync buffer and the shipped
    /// [`DefaultDecompressor`].
    pub fn new(tokenizer: T) -> Self {
        Self::with_sync_buffer_len(tokenizer, DEFAULT_SYNC_BUFFER_LEN)
    }

    /// Construct an engine with a non-default sync buffer size, for tuning I/O without changing
    /// the rest of the API shape.
    pub fn with_sync_buffer_len(tokenizer: T, len: usize) -> Self {
        Self {
            tokenizer,
            sync_buffer: vec![0u8; len],
            decompressor: Box::new(DefaultDecompressor),
        }
    }

    /// Swap in a caller-supplied decompressor, e.g. one that also handles a vendor-specific
    /// compression method.
    pub fn with_decompressor(mut self, decompressor: impl Decompressor + 'static) -> Self {
        self.decompressor = Box::new(decompressor);
        self
    }

    /// Give back the wrapped tokenizer, e.g. so the caller can close it explicitly.
    pub fn into_tokenizer(self) -> T {
        self.tokenizer
    }

    /// Peek a 4-byte signature at the current position and check it against
    /// [`LOCAL_FILE_HEADER_SIGNATURE`]. Does not advance the position.
    pub async fn is_zip(&mut self) -> Result<bool> {
        let mut sig = [0u8; 4];
        let n = self.tokenizer.peek(&mut sig).await?;
        if n < 4 {
            return Ok(false);
        }
        Ok(codec::peek_signature(&sig) == LOCAL_FILE_HEADER_SIGNATURE)
    }

    /// Locate the EOCD record by scanning the last `min(16 KiB, file_size)` bytes backwards for
    /// its signature. Requires random access.
    pub async fn find_end_of_central_directory_locator(&mut self) -> Result<Option<u64>> {
        if !self.tokenizer.supports_random_access() {
            return Err(SZipError::InvalidFormat(
                "find_end_of_central_directory_locator requires random access".to_string(),
            ));
        }
        let size = self.tokenizer.file_size().unwrap_or(0);
        let scan_len = EOCD_TAIL_SCAN_LEN.min(size as usize) as u64;
        let tail_start = size - scan_len;

        self.tokenizer.set_position(tail_start).await?;
        let buf = &mut self.sync_buffer[..scan_len as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.tokenizer.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let haystack = &buf[..filled];

        let found = (0..haystack.len().saturating_sub(3))
            .rev()
            .find(|&i| codec::peek_signature(&[haystack[i], haystack[i + 1], haystack[i + 2], haystack[i + 3]])
                == END_OF_CENTRAL_DIRECTORY_SIGNATURE);

        Ok(found.map(|i| tail_start + i as u64))
    }

    /// Resolve the full central directory. Returns `None` for sequential tokenizers so
    /// `unzip` falls back to Path B.
    pub async fn read_central_directory(&mut self) -> Result<Option<Vec<CentralDirectoryEntry>>> {
        if !self.tokenizer.supports_random_access() {
            debug!("tokenizer has no random access; central directory resolution skipped");
            return Ok(None);
        }

        let saved_position = self.tokenizer.position();

        let eocd_offset = match self.find_end_of_central_directory_locator().await? {
            Some(offset) => offset,
            None => {
                self.tokenizer.set_position(saved_position).await?;
                return Ok(None);
            }
        };

        self.tokenizer.set_position(eocd_offset).await?;
        let eocd: EndOfCentralDirectoryRecord = self.tokenizer.read_token().await?;
        codec::expect_signature(
            eocd.signature,
            END_OF_CENTRAL_DIRECTORY_SIGNATURE,
            "end of central directory record",
        )?;

        self.tokenizer
            .set_position(eocd.offset_of_start_of_cd as u64)
            .await?;

        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            let header: CentralFileHeader = self
                .tokenizer
                .read_token()
                .await
                .map_err(truncate_clean_eof)?;
            codec::expect_signature(
                header.signature,
                CENTRAL_FILE_HEADER_SIGNATURE,
                "central directory file header",
            )?;

            let name = self
                .tokenizer
                .read_utf8(header.filename_length as usize)
                .await
                .map_err(truncate_clean_eof)?;
            self.tokenizer
                .ignore(header.extra_field_length as u64)
                .await
                .map_err(truncate_clean_eof)?;
            self.tokenizer
                .ignore(header.file_comment_length as u64)
                .await
                .map_err(truncate_clean_eof)?;

            entries.push(CentralDirectoryEntry {
                name,
                compression_method: header.compression_method,
                compressed_size: header.compressed_size,
                uncompressed_size: header.uncompressed_size,
                crc32: header.crc32,
                relative_offset_of_local_header: header.relative_offset_of_local_header,
            });
        }

        self.tokenizer.set_position(saved_position).await?;
        debug!(count = entries.len(), "resolved central directory");
        Ok(Some(entries))
    }

    /// Top-level traversal. Picks Path A when a central directory resolves, Path B
    /// otherwise.
    pub async fn unzip<F: Filter>(&mut self, filter: &mut F) -> Result<()> {
        match self.read_central_directory().await? {
            Some(entries) => {
                debug!("traversing via central directory (path A)");
                self.path_a(entries, filter).await
            }
            None => {
                debug!("traversing via forward scan (path B)");
                self.path_b(filter).await
            }
        }
    }

    async fn path_a<F: Filter>(
        &mut self,
        entries: Vec<CentralDirectoryEntry>,
        filter: &mut F,
    ) -> Result<()> {
        for entry in entries {
            let header = EntryHeader {
                name: entry.name.clone(),
                compression_method: entry.compression_method,
                uncompressed_size: entry.uncompressed_size as u64,
                compressed_size: Some(entry.compressed_size as u64),
                crc32: entry.crc32,
            };
            trace!(name = %header.name, "path A: dispatching entry to filter");
            let decision = filter.filter(&header).await;

            if let Some(mut handler) = decision.handler {
                self.tokenizer
                    .set_position(entry.relative_offset_of_local_header as u64)
                    .await?;
                let local: LocalFileHeader = self
                    .tokenizer
                    .read_token()
                    .await
                    .map_err(truncate_clean_eof)?;
                codec::expect_signature(
                    local.signature,
                    LOCAL_FILE_HEADER_SIGNATURE,
                    "local file header",
                )?;
                self.tokenizer
                    .ignore((local.filename_length + local.extra_field_length) as u64)
                    .await
                    .map_err(truncate_clean_eof)?;

                let mut compressed = vec![0u8; entry.compressed_size as usize];
                self.tokenizer
                    .read_exact_at(&mut compressed)
                    .await
                    .map_err(truncate_clean_eof)?;
                let data = decompress::decompress(
                    self.decompressor.as_ref(),
                    compressed,
                    entry.compression_method,
                )
                .await?;
                handler
                    .handle(Bytes::from(data))
                    .await
                    .map_err(|e| SZipError::HandlerFailed(e.to_string()))?;
            }

            if decision.stop {
                debug!(name = %entry.name, "path A: filter requested stop");
                break;
            }
        }
        Ok(())
    }

    async fn path_b<F: Filter>(&mut self, filter: &mut F) -> Result<()> {
        loop {
            let mut sig_buf = [0u8; 4];
            let n = self.tokenizer.peek(&mut sig_buf).await?;
            if n < 4 {
                // Clean end of stream while looking for the next entry's signature: not an
                // error.
                trace!("path B: end of stream at entry boundary");
                return Ok(());
            }
            let signature = codec::peek_signature(&sig_buf);

            match signature {
                LOCAL_FILE_HEADER_SIGNATURE => {}
                CENTRAL_FILE_HEADER_SIGNATURE => {
                    trace!("path B: reached central directory, forward scan complete");
                    return Ok(());
                }
                ENCRYPTED_MARKER_SIGNATURE => return Err(SZipError::EncryptedArchive),
                other => return Err(SZipError::UnexpectedSignature(other)),
            }

            let local: LocalFileHeader = self
                .tokenizer
                .read_token()
                .await
                .map_err(truncate_clean_eof)?;
            let name = self
                .tokenizer
                .read_utf8(local.filename_length as usize)
                .await
                .map_err(truncate_clean_eof)?;

            let header = EntryHeader {
                name: name.clone(),
                compression_method: local.compression_method,
                uncompressed_size: local.uncompressed_size as u64,
                compressed_size: if local.has_data_descriptor() && local.compressed_size == 0 {
                    None
                } else {
                    Some(local.compressed_size as u64)
                },
                crc32: local.crc32,
            };
            trace!(name = %header.name, "path B: dispatching entry to filter");
            let decision = filter.filter(&header).await;

            self.tokenizer
                .ignore(local.extra_field_length as u64)
                .await
                .map_err(truncate_clean_eof)?;

            let want_bytes = decision.handler.is_some();
            let payload = if local.has_data_descriptor() && local.compressed_size == 0 {
                self.scan_for_data_descriptor(want_bytes).await?
            } else {
                self.read_known_size_payload(local.compressed_size as u64, want_bytes)
                    .await
                    .map_err(truncate_clean_eof)?
            };

            match (decision.handler, payload) {
                (Some(mut handler), Some(payload)) => {
                    let data = decompress::decompress(
                        self.decompressor.as_ref(),
                        payload,
                        local.compression_method,
                    )
                    .await?;
                    handler
                        .handle(Bytes::from(data))
                        .await
                        .map_err(|e| SZipError::HandlerFailed(e.to_string()))?;
                }
                (None, None) => {}
                _ => {
                    return Err(SZipError::CorruptArchive(
                        "payload presence disagreed with filter decision".to_string(),
                    ))
                }
            }

            if local.has_data_descriptor() {
                let descriptor: DataDescriptor = self
                    .tokenizer
                    .read_token()
                    .await
                    .map_err(truncate_clean_eof)?;
                codec::expect_signature(
                    descriptor.signature,
                    DATA_DESCRIPTOR_SIGNATURE,
                    "data descriptor",
                )?;
            }

            if decision.stop {
                debug!(name = %name, "path B: filter requested stop");
                return Ok(());
            }
        }
    }

    /// Known-size payload path: read or skip exactly `len` bytes.
    async fn read_known_size_payload(
        &mut self,
        len: u64,
        want_bytes: bool,
    ) -> Result<Option<Vec<u8>>> {
        if !want_bytes {
            self.tokenizer.ignore(len).await?;
            return Ok(None);
        }
        let mut buf = vec![0u8; len as usize];
        self.tokenizer.read_exact_at(&mut buf).await?;
        Ok(Some(buf))
    }

    /// Unknown-size payload path: scan forward in sync-buffer-sized chunks for the data
    /// descriptor signature.
    async fn scan_for_data_descriptor(&mut self, want_bytes: bool) -> Result<Option<Vec<u8>>> {
        let mut payload = if want_bytes { Some(Vec::new()) } else { None };
        let buf_len = self.sync_buffer.len();

        loop {
            let n = {
                let buf = &mut self.sync_buffer[..buf_len];
                self.tokenizer.peek(buf).await?
            };
            if n == 0 {
                warn!("data descriptor scan hit end of stream without finding signature");
                return Err(SZipError::TruncatedArchive);
            }

            let window = &self.sync_buffer[..n];
            if let Some(k) = find_signature(window, DATA_DESCRIPTOR_SIGNATURE) {
                if let Some(ref mut out) = payload {
                    out.extend_from_slice(&window[..k]);
                }
                self.tokenizer.ignore(k as u64).await?;
                return Ok(payload);
            }

            // No match in this window: consume it all and keep scanning. Signatures never
            // straddle a chunk boundary undetected because we always leave the last 3 bytes
            // unconsumed when a full buffer was read, letting them reappear at the front of the
            // next peek.
            let consume_len = if n == buf_len { n - 3 } else { n };
            if let Some(ref mut out) = payload {
                out.extend_from_slice(&self.sync_buffer[..consume_len]);
            }
            self.tokenizer.ignore(consume_len as u64).await?;

            if n < buf_len {
                // Short peek: end of stream reached without ever finding the signature.
                warn!("data descriptor scan hit end of stream without finding signature");
                return Err(SZipError::TruncatedArchive);
            }
        }
    }
}

fn find_signature(haystack: &[u8], signature: u32) -> Option<usize> {
    if haystack.len() < 4 {
        return None;
    }
    let needle = signature.to_le_bytes();
    haystack.windows(4).position(|w| w == needle)
}

/// Maps an I/O short-read surfaced by the tokenizer to the engine's own vocabulary: a clean EOF
/// partway through a record the caller expected to be complete is a truncation, not a silent
/// stop.
pub(crate) fn truncate_clean_eof(err: SZipError) -> SZipError {
    if is_eof(&err) {
        SZipError::TruncatedArchive
    } else {
        err
    }
}
