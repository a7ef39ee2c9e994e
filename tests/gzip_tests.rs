//! Tests for the GZIP stream inflater.

mod common;

use async_trait::async_trait;
use futures_util::StreamExt;
use zip_tokenizer::{GzipInflater, Result, SZipError, StreamTokenizer, Tokenizer};

async fn collect(bytes: Vec<u8>) -> zip_tokenizer::Result<Vec<u8>> {
    let tokenizer = StreamTokenizer::new(std::io::Cursor::new(bytes));
    let mut stream = GzipInflater::new(tokenizer).inflate();
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

/// A tokenizer that yields a complete, valid byte sequence and then fails the very next `read`
/// call with a genuine I/O error, simulating a source (e.g. a network socket) that drops right
/// after delivering the full gzip member.
struct FailsAfterDeliveringEverything {
    data: Vec<u8>,
    pos: usize,
    position: u64,
}

#[async_trait]
impl Tokenizer for FailsAfterDeliveringEverything {
    async fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        let avail = &self.data[self.pos..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        Ok(n)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.data.len() {
            return Err(SZipError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "simulated connection reset after full delivery",
            )));
        }
        let avail = &self.data[self.pos..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        self.pos += n;
        self.position += n as u64;
        Ok(n)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn supports_random_access(&self) -> bool {
        false
    }

    async fn set_position(&mut self, _pos: u64) -> Result<()> {
        Err(SZipError::InvalidFormat("no random access".to_string()))
    }
}

#[tokio::test]
async fn inflates_a_whole_gzip_member() {
    let original = "the quick brown fox jumps over the lazy dog\n".repeat(50);
    let compressed = common::build_gzip(original.as_bytes());

    let out = collect(compressed).await.unwrap();
    assert_eq!(out, original.as_bytes());
}

#[tokio::test]
async fn inflates_an_empty_member() {
    let compressed = common::build_gzip(b"");
    let out = collect(compressed).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn truncated_gzip_member_surfaces_as_an_error() {
    let original = "data that will never fully arrive".repeat(20);
    let mut compressed = common::build_gzip(original.as_bytes());
    compressed.truncate(compressed.len() / 2);

    let result = collect(compressed).await;
    match result {
        Err(SZipError::DecompressionFailed(_)) => {}
        other => panic!("expected DecompressionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn tokenizer_read_error_after_a_complete_member_still_surfaces() {
    let original = "the quick brown fox jumps over the lazy dog\n".repeat(50);
    let compressed = common::build_gzip(original.as_bytes());

    let tokenizer = FailsAfterDeliveringEverything {
        data: compressed,
        pos: 0,
        position: 0,
    };
    let mut stream = GzipInflater::new(tokenizer).inflate();

    let mut out = Vec::new();
    let mut saw_error = false;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => out.extend_from_slice(&bytes),
            Err(SZipError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
                saw_error = true;
                break;
            }
            Err(other) => panic!("expected a tokenizer Io error, got {other:?}"),
        }
    }

    assert!(
        saw_error,
        "tokenizer read error must surface even though the gzip member itself fully decoded"
    );
}
