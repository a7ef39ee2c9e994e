//! Pure decoders for the four on-disk record shapes the engine reads.
//!
//! Every decoder here is synchronous: `&[u8] -> Result<Record>`. None of them touch a
//! [`crate::tokenizer::Tokenizer`] or advance any position — that's the engine's job. Variable-
//! length tails (filename, extra field, comment) are read by the caller as counted byte strings,
//! not by these decoders.

use crate::error::{Result, SZipError};
use crate::tokenizer::Token;

/// Local file header signature, `PK\x03\x04`.
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// Central directory file header signature, `PK\x01\x02`.
pub const CENTRAL_FILE_HEADER_SIGNATURE: u32 = 0x0201_4b50;
/// End-of-central-directory record signature, `PK\x05\x06`.
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
/// Data descriptor signature, `PK\x07\x08`.
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
/// Marker for an encrypted-file record, out of scope for this engine.
pub const ENCRYPTED_MARKER_SIGNATURE: u32 = 0xE011_CFD0;

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn check_len(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(crate::error::eof_error());
    }
    Ok(())
}

/// The 30-byte fixed portion of a Local File Header, immediately preceding a compressed payload.
#[derive(Debug, Clone, Copy)]
pub struct LocalFileHeader {
    pub signature: u32,
    pub min_version: u16,
    pub general_flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    /// `true` iff bit 3 of the general-purpose flags is set, meaning sizes/CRC follow the
    /// payload in a trailing [`DataDescriptor`] instead of being known up front.
    pub fn has_data_descriptor(&self) -> bool {
        self.general_flags & 0x0008 != 0
    }
}

impl Token for LocalFileHeader {
    const LEN: usize = 30;

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::LEN)?;
        Ok(Self {
            signature: le_u32(buf, 0),
            min_version: le_u16(buf, 4),
            general_flags: le_u16(buf, 6),
            compression_method: le_u16(buf, 8),
            last_mod_time: le_u16(buf, 10),
            last_mod_date: le_u16(buf, 12),
            crc32: le_u32(buf, 14),
            compressed_size: le_u32(buf, 18),
            uncompressed_size: le_u32(buf, 22),
            filename_length: le_u16(buf, 26),
            extra_field_length: le_u16(buf, 28),
        })
    }
}

/// The 46-byte fixed portion of a Central Directory File Header.
#[derive(Debug, Clone)]
pub struct CentralFileHeader {
    pub signature: u32,
    pub min_version: u16,
    pub general_flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub relative_offset_of_local_header: u32,
}

impl Token for CentralFileHeader {
    const LEN: usize = 46;

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::LEN)?;
        Ok(Self {
            signature: le_u32(buf, 0),
            // version made by at offset 4 is intentionally not surfaced; nothing downstream
            // needs it.
            min_version: le_u16(buf, 6),
            general_flags: le_u16(buf, 8),
            compression_method: le_u16(buf, 10),
            last_mod_time: le_u16(buf, 12),
            last_mod_date: le_u16(buf, 14),
            crc32: le_u32(buf, 16),
            compressed_size: le_u32(buf, 20),
            uncompressed_size: le_u32(buf, 24),
            filename_length: le_u16(buf, 28),
            extra_field_length: le_u16(buf, 30),
            file_comment_length: le_u16(buf, 32),
            disk_number_start: le_u16(buf, 34),
            internal_attrs: le_u16(buf, 36),
            external_attrs: le_u32(buf, 38),
            relative_offset_of_local_header: le_u32(buf, 42),
        })
    }
}

/// The 22-byte fixed portion of the End-of-Central-Directory record (the comment tail is read
/// separately by the caller, if ever needed).
#[derive(Debug, Clone, Copy)]
pub struct EndOfCentralDirectoryRecord {
    pub signature: u32,
    pub disk_number: u16,
    pub cd_start_disk: u16,
    pub entries_on_this_disk: u16,
    pub total_entries: u16,
    pub size_of_cd: u32,
    pub offset_of_start_of_cd: u32,
    pub zip_file_comment_length: u16,
}

impl Token for EndOfCentralDirectoryRecord {
    const LEN: usize = 22;

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::LEN)?;
        Ok(Self {
            signature: le_u32(buf, 0),
            disk_number: le_u16(buf, 4),
            cd_start_disk: le_u16(buf, 6),
            entries_on_this_disk: le_u16(buf, 8),
            total_entries: le_u16(buf, 10),
            size_of_cd: le_u32(buf, 12),
            offset_of_start_of_cd: le_u32(buf, 16),
            zip_file_comment_length: le_u16(buf, 20),
        })
    }
}

/// The 16-byte Data Descriptor trailing a payload whose sizes weren't known up front.
#[derive(Debug, Clone, Copy)]
pub struct DataDescriptor {
    pub signature: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl Token for DataDescriptor {
    const LEN: usize = 16;

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::LEN)?;
        Ok(Self {
            signature: le_u32(buf, 0),
            crc32: le_u32(buf, 4),
            compressed_size: le_u32(buf, 8),
            uncompressed_size: le_u32(buf, 12),
        })
    }
}

/// Read a 4-byte little-endian signature from the front of `buf`, for ad-hoc signature peeks
/// (e.g. `is_zip`, Path B's per-entry dispatch) that don't warrant a whole [`Token`] impl.
pub fn peek_signature(buf: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*buf)
}

/// Validate that a just-decoded record's signature matches `expected`, producing the
/// `CorruptArchive` variant the engine uses for structural mismatches deeper than the first
/// per-entry dispatch.
pub fn expect_signature(actual: u32, expected: u32, what: &str) -> Result<()> {
    if actual != expected {
        return Err(SZipError::CorruptArchive(format!(
            "{what}: expected signature 0x{expected:08x}, got 0x{actual:08x}"
        )));
    }
    Ok(())
}
