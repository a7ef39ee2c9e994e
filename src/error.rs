//! Error types for zip-tokenizer

use std::io;

/// Result type for zip-tokenizer operations
pub type Result<T> = std::result::Result<T, SZipError>;

/// Error types that can occur while reading a ZIP or GZIP stream through a [`crate::tokenizer::Tokenizer`].
#[derive(Debug)]
pub enum SZipError {
    /// I/O error from the underlying tokenizer. End-of-stream is
    /// `Io(e)` with `e.kind() == io::ErrorKind::UnexpectedEof`.
    Io(io::Error),
    /// Invalid ZIP format or structure (e.g. a non-UTF-8 filename).
    InvalidFormat(String),
    /// Entry not found in a resolved central directory.
    EntryNotFound(String),
    /// Unsupported compression method encountered by a [`crate::decompress::Decompressor`].
    UnsupportedCompression(u16),
    /// `is_zip`/Path B's first signature check failed: the stream does not start
    /// with a local file header.
    NotAZip,
    /// The encrypted-file marker signature was encountered; encryption is out of scope.
    EncryptedArchive,
    /// A peeked 4-byte value matched no known record at a position where one was required.
    UnexpectedSignature(u32),
    /// A required signature (data descriptor, central file header, EOCD) did not match.
    CorruptArchive(String),
    /// End-of-stream reached mid-record, distinct from a clean end-of-entries termination.
    TruncatedArchive,
    /// The decompressor reported an error.
    DecompressionFailed(String),
    /// The user-supplied entry handler's future resolved to an error.
    HandlerFailed(String),
}

impl std::fmt::Display for SZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SZipError::Io(e) => write!(f, "I/O error: {}", e),
            SZipError::InvalidFormat(msg) => write!(f, "invalid ZIP format: {}", msg),
            SZipError::EntryNotFound(name) => write!(f, "entry not found: {}", name),
            SZipError::UnsupportedCompression(method) => {
                write!(f, "unsupported compression method: {}", method)
            }
            SZipError::NotAZip => write!(f, "not a ZIP archive"),
            SZipError::EncryptedArchive => write!(f, "archive entry is encrypted"),
            SZipError::UnexpectedSignature(sig) => {
                write!(f, "unexpected signature: 0x{:08x}", sig)
            }
            SZipError::CorruptArchive(msg) => write!(f, "corrupt archive: {}", msg),
            SZipError::TruncatedArchive => write!(f, "archive truncated mid-record"),
            SZipError::DecompressionFailed(msg) => write!(f, "decompression failed: {}", msg),
            SZipError::HandlerFailed(msg) => write!(f, "entry handler failed: {}", msg),
        }
    }
}

impl std::error::Error for SZipError {}

impl From<io::Error> for SZipError {
    fn from(err: io::Error) -> Self {
        SZipError::Io(err)
    }
}

/// True iff `err` represents a clean end-of-stream rather than a genuine I/O failure.
pub(crate) fn is_eof(err: &SZipError) -> bool {
    matches!(err, SZipError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

pub(crate) fn eof_error() -> SZipError {
    SZipError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream"))
}
