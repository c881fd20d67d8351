// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `header` module serializes and parses the per-image header.
//!
//! Each image carries a 768-byte header block: 21 fixed bytes, the variable
//! metadata mapping, and zero padding. Two 128-bit MurmurHash3 checksums, one
//! over the fixed region and one over the variable region, are stored in the
//! last four blocks of the text row.

use std::collections::BTreeMap;

use pxf_core::checksum::murmur3_x64_128;
use pxf_core::errors::{decode_error, metadata_error, Result};
use pxf_core::errors::MetadataErrorKind;
use pxf_core::io::{BufReader, BufWriter};

use crate::common::{ChannelMode, validate, FORMAT_VERSION, HEADER_BYTES, HEADER_FIXED_BYTES, METADATA_MAX_BYTES};

/// A metadata mapping. The ordered map keeps keys unique and sorted, which
/// the wire format requires at serialization time.
pub type MetadataMap = BTreeMap<String, String>;

/// The parsed per-image header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Sample rate in Hz; zero for binary payloads.
    pub sample_rate: u32,
    /// Total samples per channel for audio, chunk byte count for binary.
    pub total: u32,
    pub channel_mode: ChannelMode,
    /// Shared across all images of one payload; the decoder groups by it.
    pub salt: [u8; 4],
    /// 1-based position of this image.
    pub image_index: u16,
    pub total_images: u16,
    pub metadata: MetadataMap,
}

impl Header {
    /// Serializes the header into its fixed 768-byte block.
    pub fn serialize(&self) -> Result<[u8; HEADER_BYTES]> {
        let metadata = serialize_metadata(&self.metadata)?;

        let mut writer = BufWriter::with_capacity(HEADER_BYTES);
        writer.write_u16(FORMAT_VERSION);
        writer.write_u32(self.sample_rate);
        writer.write_u32(self.total);
        writer.write_u16(metadata.len() as u16);
        writer.write_u8(self.channel_mode.as_u8());
        writer.write_buf_bytes(&self.salt);
        writer.write_u16(self.image_index);
        writer.write_u16(self.total_images);
        debug_assert_eq!(writer.len(), HEADER_FIXED_BYTES);

        writer.write_buf_bytes(&metadata);
        writer.pad_to(HEADER_BYTES);

        let mut out = [0u8; HEADER_BYTES];
        out.copy_from_slice(&writer.finish());
        Ok(out)
    }

    /// Parses a recovered 768-byte header block. The caller is expected to
    /// have validated the checksums first.
    pub fn parse(bytes: &[u8; HEADER_BYTES]) -> Result<Header> {
        let mut reader = BufReader::new(bytes);

        let version = reader.read_u16()?;
        if version != FORMAT_VERSION {
            return Err(pxf_core::errors::Error::UnsupportedVersion(version));
        }

        let sample_rate = reader.read_u32()?;
        let total = reader.read_u32()?;
        let metadata_len = reader.read_u16()? as usize;
        let mode = reader.read_u8()?;
        let salt = reader.read_quad_bytes()?;
        let image_index = reader.read_u16()?;
        let total_images = reader.read_u16()?;

        validate!(metadata_len <= METADATA_MAX_BYTES);
        let channel_mode = match ChannelMode::from_u8(mode) {
            Some(mode) => mode,
            None => return decode_error("pxf: invalid channel mode"),
        };

        let metadata = parse_metadata(&bytes[HEADER_FIXED_BYTES..HEADER_FIXED_BYTES + metadata_len])?;

        Ok(Header {
            sample_rate,
            total,
            channel_mode,
            salt,
            image_index,
            total_images,
            metadata,
        })
    }

    /// The two concatenated 128-bit checksums of a serialized header: the
    /// fixed region, then the variable region including padding.
    pub fn checksum(bytes: &[u8; HEADER_BYTES]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&murmur3_x64_128(&bytes[..HEADER_FIXED_BYTES], 0));
        out[16..].copy_from_slice(&murmur3_x64_128(&bytes[HEADER_FIXED_BYTES..], 0));
        out
    }
}

/// Serializes a metadata mapping: a count byte, then per entry a big-endian
/// length word (key length in the top 4 bits, value length in the low 12)
/// followed by the raw UTF-8 key and value bytes.
pub fn serialize_metadata(metadata: &MetadataMap) -> Result<Vec<u8>> {
    if metadata.len() > 255 {
        return metadata_error(MetadataErrorKind::TooManyEntries);
    }

    let mut writer = BufWriter::new();
    writer.write_u8(metadata.len() as u8);

    for (key, value) in metadata {
        if key.len() > 15 {
            return metadata_error(MetadataErrorKind::KeyTooLong);
        }
        if value.len() > 4095 {
            return metadata_error(MetadataErrorKind::ValueTooLong);
        }
        writer.write_be_u16(((key.len() as u16) << 12) | value.len() as u16);
        writer.write_buf_bytes(key.as_bytes());
        writer.write_buf_bytes(value.as_bytes());
    }

    if writer.len() > METADATA_MAX_BYTES {
        return metadata_error(MetadataErrorKind::TooLarge);
    }

    Ok(writer.finish())
}

/// Parses a serialized metadata mapping.
pub fn parse_metadata(bytes: &[u8]) -> Result<MetadataMap> {
    let mut reader = BufReader::new(bytes);
    let count = reader.read_u8()?;

    let mut metadata = MetadataMap::new();

    for _ in 0..count {
        let word = reader.read_be_u16()?;
        let key_len = (word >> 12) as usize;
        let value_len = (word & 0x0FFF) as usize;

        let mut key = vec![0u8; key_len];
        reader.read_buf_exact(&mut key)?;
        let mut value = vec![0u8; value_len];
        reader.read_buf_exact(&mut value)?;

        let key = match String::from_utf8(key) {
            Ok(key) => key,
            Err(_) => return decode_error("pxf: metadata key is not utf-8"),
        };
        let value = match String::from_utf8(value) {
            Ok(value) => value,
            Err(_) => return decode_error("pxf: metadata value is not utf-8"),
        };

        metadata.insert(key, value);
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        let mut metadata = MetadataMap::new();
        metadata.insert("artist".into(), "Test".into());
        metadata.insert("title".into(), "Song".into());

        Header {
            sample_rate: 44100,
            total: 4410,
            channel_mode: ChannelMode::Mono,
            salt: [1, 2, 3, 4],
            image_index: 1,
            total_images: 1,
            metadata,
        }
    }

    #[test]
    fn verify_header_roundtrip() {
        let header = sample_header();
        let bytes = header.serialize().unwrap();
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn verify_unicode_metadata_roundtrip() {
        let mut header = sample_header();
        header.metadata.insert("unicode_test".into(), "日本語🎵".into());
        let bytes = header.serialize().unwrap();
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn verify_metadata_keys_serialize_sorted() {
        let mut metadata = MetadataMap::new();
        metadata.insert("zebra".into(), "1".into());
        metadata.insert("apple".into(), "2".into());

        let bytes = serialize_metadata(&metadata).unwrap();
        // First entry after the count byte and length word must be "apple".
        assert_eq!(&bytes[3..8], b"apple");
    }

    #[test]
    fn verify_metadata_limits() {
        let mut metadata = MetadataMap::new();
        metadata.insert("k".repeat(16), "v".into());
        assert!(matches!(
            serialize_metadata(&metadata),
            Err(pxf_core::errors::Error::Metadata(MetadataErrorKind::KeyTooLong))
        ));

        let mut metadata = MetadataMap::new();
        metadata.insert("k".into(), "v".repeat(4096));
        assert!(matches!(
            serialize_metadata(&metadata),
            Err(pxf_core::errors::Error::Metadata(MetadataErrorKind::ValueTooLong))
        ));

        // Entries that are each legal but together overflow the reserved
        // header space.
        let mut metadata = MetadataMap::new();
        for i in 0..8 {
            metadata.insert(format!("key{}", i), "v".repeat(100));
        }
        assert!(matches!(
            serialize_metadata(&metadata),
            Err(pxf_core::errors::Error::Metadata(MetadataErrorKind::TooLarge))
        ));
    }

    #[test]
    fn verify_wrong_version_is_rejected() {
        let header = sample_header();
        let mut bytes = header.serialize().unwrap();
        bytes[0] = 0x2B;
        bytes[1] = 0x01; // version 299
        assert!(matches!(
            Header::parse(&bytes),
            Err(pxf_core::errors::Error::UnsupportedVersion(299))
        ));
    }

    #[test]
    fn verify_checksum_covers_both_regions() {
        let header = sample_header();
        let bytes = header.serialize().unwrap();
        let checksum = Header::checksum(&bytes);

        let mut fixed_tampered = bytes;
        fixed_tampered[4] ^= 1;
        let tampered = Header::checksum(&fixed_tampered);
        assert_ne!(checksum[..16], tampered[..16]);
        assert_eq!(checksum[16..], tampered[16..]);

        let mut meta_tampered = bytes;
        meta_tampered[30] ^= 1;
        let tampered = Header::checksum(&meta_tampered);
        assert_eq!(checksum[..16], tampered[..16]);
        assert_ne!(checksum[16..], tampered[16..]);
    }
}
