//! Hand-built ZIP byte fixtures shared by the engine and tokenizer tests.
//!
//! These construct archives directly at the byte level instead of round-tripping through a
//! writer (this crate doesn't ship one) so each test controls exactly which record shape it's
//! exercising: stored vs. deflated, known size vs. trailing data descriptor.

use std::io::Write;

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const CENTRAL_FILE_HEADER_SIGNATURE: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;
pub const METHOD_DEFLATE64: u16 = 9;

pub struct EntrySpec {
    pub name: &'static str,
    pub data: Vec<u8>,
    pub method: u16,
    pub data_descriptor: bool,
}

impl EntrySpec {
    pub fn stored(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            method: METHOD_STORED,
            data_descriptor: false,
        }
    }

    pub fn deflated(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            method: METHOD_DEFLATE,
            data_descriptor: false,
        }
    }

    pub fn with_data_descriptor(mut self) -> Self {
        self.data_descriptor = true;
        self
    }

    /// Labels the entry as DEFLATE64 while still compressing with plain DEFLATE — for inputs
    /// small enough to never need DEFLATE64's extended distance/length codes, the two bitstreams
    /// are identical, which is all a round-trip fixture needs (the `deflate64` crate ships a
    /// decoder only, no encoder).
    pub fn deflate64(name: &'static str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            data: data.into(),
            method: METHOD_DEFLATE64,
            data_descriptor: false,
        }
    }
}

fn payload_for(spec: &EntrySpec) -> Vec<u8> {
    match spec.method {
        METHOD_STORED => spec.data.clone(),
        METHOD_DEFLATE | METHOD_DEFLATE64 => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&spec.data).unwrap();
            encoder.finish().unwrap()
        }
        other => panic!("unsupported fixture method {other}"),
    }
}

/// Assemble a complete ZIP archive (local entries + central directory + EOCD) from `specs`.
pub fn build_zip(specs: &[EntrySpec]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut local_offsets = Vec::with_capacity(specs.len());
    let mut payloads = Vec::with_capacity(specs.len());

    for spec in specs {
        local_offsets.push(out.len() as u32);
        let payload = payload_for(spec);

        let flags: u16 = if spec.data_descriptor { 0x0008 } else { 0 };
        let (header_compressed_size, header_uncompressed_size) = if spec.data_descriptor {
            (0u32, 0u32)
        } else {
            (payload.len() as u32, spec.data.len() as u32)
        };

        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&spec.method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32 (unverified by this engine)
        out.extend_from_slice(&header_compressed_size.to_le_bytes());
        out.extend_from_slice(&header_uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
        out.extend_from_slice(spec.name.as_bytes());
        out.extend_from_slice(&payload);

        if spec.data_descriptor {
            out.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // crc32
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(spec.data.len() as u32).to_le_bytes());
        }

        payloads.push(payload);
    }

    let cd_start = out.len() as u32;
    for (spec, (local_offset, payload)) in specs
        .iter()
        .zip(local_offsets.iter().zip(payloads.iter()))
    {
        out.extend_from_slice(&CENTRAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // general flags (descriptor resolved already)
        out.extend_from_slice(&spec.method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(spec.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
        out.extend_from_slice(&0u16.to_le_bytes()); // file comment length
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&local_offset.to_le_bytes());
        out.extend_from_slice(spec.name.as_bytes());
    }
    let cd_size = out.len() as u32 - cd_start;

    out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // cd start disk
    out.extend_from_slice(&(specs.len() as u16).to_le_bytes());
    out.extend_from_slice(&(specs.len() as u16).to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_start.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length

    out
}

/// A standalone gzip member wrapping `data`.
pub fn build_gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
