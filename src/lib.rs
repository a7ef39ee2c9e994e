//! # zip-tokenizer: streaming ZIP and GZIP access over a pluggable tokenizer
//!
//! `zip-tokenizer` reads ZIP archives and GZIP streams through a small [`Tokenizer`]
//! abstraction rather than assuming a `File` or an in-memory buffer. The same [`ZipEngine`] walks
//! a random-access archive by its central directory or scans a sequential-only stream (an HTTP
//! response body, a pipe) forward entry by entry, picking the strategy the tokenizer supports.
//!
//! ## Features
//!
//! - **Streaming-first**: a sequential-only source is handled via a forward scan; nothing
//!   requires seeking unless the tokenizer supports it.
//! - **Low memory**: only the entry currently being extracted is ever buffered; other entries are
//!   skipped without being read into memory.
//! - **Pluggable decompression**: compression routing goes through the [`Decompressor`] trait,
//!   so callers can swap in their own DEFLATE/DEFLATE64 implementation.
//! - **Selective extraction**: a [`Filter`] decides, per entry, whether to skip it, extract it,
//!   or extract it and stop traversal early.
//!
//! ## Quick start
//!
//! ### Reading selected entries out of a ZIP file
//!
//! ```no_run
//! use zip_tokenizer::{EntryHeader, FileTokenizer, FilterDecision, ZipEngine};
//!
//! # async fn run() -> zip_tokenizer::Result<()> {
//! let tokenizer = FileTokenizer::open("archive.zip").await?;
//! let mut engine = ZipEngine::new(tokenizer);
//!
//! engine
//!     .unzip(&mut |header: &EntryHeader| {
//!         if header.name.ends_with(".txt") {
//!             FilterDecision::extract(Box::new(|data| {
//!                 println!("read {} bytes", data.len());
//!                 Ok(())
//!             }))
//!         } else {
//!             FilterDecision::ignore()
//!         }
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Inflating a GZIP stream
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use zip_tokenizer::{FileTokenizer, GzipInflater};
//!
//! # async fn run() -> zip_tokenizer::Result<()> {
//! let tokenizer = FileTokenizer::open("archive.tar.gz").await?;
//! let mut stream = GzipInflater::new(tokenizer).inflate();
//! while let Some(chunk) = stream.next().await {
//!     let chunk = chunk?;
//!     // ... consume `chunk` ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod decompress;
pub mod engine;
pub mod error;
pub mod gzip;
pub mod tokenizer;

pub use decompress::{DefaultDecompressor, Decompressor};
pub use engine::{CentralDirectoryEntry, EntryHandler, EntryHeader, Filter, FilterDecision, ZipEngine};
pub use error::{Result, SZipError};
pub use gzip::GzipInflater;
pub use tokenizer::{FileTokenizer, StreamTokenizer, Token, Tokenizer};
