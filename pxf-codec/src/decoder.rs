// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The decoder entry points: header recovery, salt-group assembly, stereo
//! validation, and dispatch to the audio or binary payload path.

use bitflags::bitflags;

use pxf_core::errors::{Error, Result};
use pxf_core::util::bits;

use crate::common::{
    whiten_mask, ChannelMode, validate, BINARY_ROW_BYTES, BLOCKS_PER_ROW, BLOCK_DIM,
    DATA_BLOCKS_PER_ROW, HEADER_BYTES, HEADER_XOR_MASK_SEED, HOP, IMAGE_WIDTH,
    META_BLOCKS_PER_ROW,
};
use crate::header::{Header, MetadataMap};
use crate::image::read_block_levels;
use crate::ldpc;
use crate::row::{binary, LLR_1BIT_LUMA};
use crate::stream::StreamingAudioDecoder;

/// A decoder input image. The pixel buffer stays owned by the caller; the
/// streaming decoder holds borrows into it.
pub struct SourceImage<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

bitflags! {
    /// Non-fatal observations accumulated while decoding.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ValidationFlags: u32 {
        /// Some LDPC decode only succeeded through the OSD fallback.
        const OSD_USED = 1 << 0;
        /// Some audio row metadata fell back to neutral defaults.
        const ROW_FALLBACK = 1 << 1;
        /// Some binary row failed its CRC after error correction.
        const CHECKSUM_FAILED = 1 << 2;
        /// The chosen group does not contain every image of the payload.
        const IMAGE_COUNT_MISMATCH = 1 << 3;
        /// Images from other payloads were present and ignored.
        const GROUP_DISCARDED = 1 << 4;
        /// A stereo mid image decoded without its side partner.
        const SIDE_MISSING = 1 << 5;
    }
}

/// A fully decoded payload.
pub enum DecodeResult<'a> {
    Audio(AudioDecodeResult<'a>),
    Binary(BinaryDecodeResult),
}

pub struct AudioDecodeResult<'a> {
    /// One buffer per output channel (left/right for stereo payloads).
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub metadata: MetadataMap,
    pub salt: [u8; 4],
    /// Input position of the first image of the decoded group.
    pub source_image_index: usize,
    pub flags: ValidationFlags,
    /// A seekable decoder over the same payload, borrowing the input images.
    pub decoder: StreamingAudioDecoder<'a>,
}

pub struct BinaryDecodeResult {
    pub bytes: Vec<u8>,
    pub metadata: MetadataMap,
    /// True when every row passed its CRC.
    pub valid_checksum: bool,
    pub flags: ValidationFlags,
}

/// Header-level information of a payload, recovered without decoding it.
pub struct MetadataSummary {
    pub metadata: MetadataMap,
    pub channel_mode: ChannelMode,
    pub sample_rate: u32,
    pub total: u32,
    pub salt: [u8; 4],
    pub total_images: u16,
    pub images_present: usize,
}

struct ParsedImage<'a> {
    source: &'a SourceImage<'a>,
    input_index: usize,
    header: Header,
    osd: bool,
}

impl ParsedImage<'_> {
    fn payload_rows(&self) -> usize {
        self.source.height as usize / BLOCK_DIM - 2
    }
}

/// Recovers and validates the header of one image.
fn parse_image<'a>(source: &'a SourceImage<'a>, input_index: usize) -> Result<ParsedImage<'a>> {
    if source.width != IMAGE_WIDTH {
        return Err(Error::InvalidImageWidth(source.width));
    }
    if source.height % BLOCK_DIM as u32 != 0 || source.height < 3 * BLOCK_DIM as u32 {
        return Err(Error::InvalidImageHeight(source.height));
    }
    let expected = (source.width * source.height * 4) as usize;
    validate!(source.data.len() >= expected);

    // Row 0: the whitened header codeword, one bit per pixel.
    let levels = read_block_levels(source.data, source.width, 0, 0, BLOCKS_PER_ROW);
    let code = ldpc::header_code();
    let mask = whiten_mask(HEADER_XOR_MASK_SEED, code.n() / 8);

    let llr: Vec<f64> = levels
        .iter()
        .enumerate()
        .map(|(i, &level)| {
            let soft = LLR_1BIT_LUMA[level as usize];
            if mask[i / 8] >> (7 - i % 8) & 1 != 0 {
                -soft
            }
            else {
                soft
            }
        })
        .collect();

    let decoded = code.decode(&llr);
    if !decoded.corrected {
        return Err(Error::HeaderChecksumInvalid);
    }

    let header_bytes: [u8; HEADER_BYTES] = decoded.bytes().try_into().unwrap();

    // The checksum blocks live in the tail of the text row.
    let checksum_levels =
        read_block_levels(source.data, source.width, 1, DATA_BLOCKS_PER_ROW, META_BLOCKS_PER_ROW);
    let checksum_bits: Vec<u8> = checksum_levels.iter().map(|&l| u8::from(l >= 128)).collect();
    let stored = bits::pack_msb(&checksum_bits);

    if stored != Header::checksum(&header_bytes) {
        return Err(Error::HeaderChecksumInvalid);
    }

    let header = Header::parse(&header_bytes)?;

    Ok(ParsedImage { source, input_index, header, osd: decoded.osd })
}

/// Parses every input, partitions by salt, and returns the winning group in
/// image-index order together with the accumulated flags.
fn assemble<'a>(sources: &'a [SourceImage<'a>]) -> Result<(Vec<ParsedImage<'a>>, ValidationFlags)> {
    if sources.is_empty() {
        return Err(Error::NoSources);
    }

    let mut parsed = Vec::with_capacity(sources.len());
    for (input_index, source) in sources.iter().enumerate() {
        parsed.push(parse_image(source, input_index)?);
    }

    let audio = parsed.iter().any(|p| p.header.channel_mode.is_audio());
    let binary = parsed.iter().any(|p| p.header.channel_mode == ChannelMode::Binary);
    if audio && binary {
        return Err(Error::MixedAudioBinary);
    }

    // Partition by salt, preserving first-appearance order so a tie between
    // groups resolves to the earliest input.
    let mut salts: Vec<[u8; 4]> = Vec::new();
    let mut groups: Vec<Vec<ParsedImage<'a>>> = Vec::new();
    for image in parsed {
        match salts.iter().position(|&s| s == image.header.salt) {
            Some(at) => groups[at].push(image),
            None => {
                salts.push(image.header.salt);
                groups.push(vec![image]);
            }
        }
    }

    let mut flags = ValidationFlags::empty();

    let winner = groups.iter().map(Vec::len).enumerate().max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0))).map(|(i, _)| i).unwrap();
    if groups.len() > 1 {
        log::warn!(
            "{} image(s) from other payloads were discarded",
            groups.iter().enumerate().filter(|&(i, _)| i != winner).map(|(_, g)| g.len()).sum::<usize>()
        );
        flags |= ValidationFlags::GROUP_DISCARDED;
    }

    let mut group = groups.swap_remove(winner);
    group.sort_by_key(|image| image.header.image_index);

    if group.iter().any(|p| p.osd) {
        flags |= ValidationFlags::OSD_USED;
    }

    let expected = group[0].header.total_images as usize;
    if group.len() != expected {
        log::warn!("decoding {} of {} images", group.len(), expected);
        flags |= ValidationFlags::IMAGE_COUNT_MISMATCH;
    }

    Ok((group, flags))
}

/// Decodes a source set into its payload.
pub fn decode<'a>(sources: &'a [SourceImage<'a>]) -> Result<DecodeResult<'a>> {
    let (group, flags) = assemble(sources)?;

    if group[0].header.channel_mode == ChannelMode::Binary {
        decode_binary(&group, flags).map(DecodeResult::Binary)
    }
    else {
        let mut decoder = build_audio_decoder(group, flags)?;
        let channels = decoder.decode_all();

        Ok(DecodeResult::Audio(AudioDecodeResult {
            channels,
            sample_rate: decoder.sample_rate(),
            metadata: decoder.payload_metadata().clone(),
            salt: decoder.payload_salt(),
            source_image_index: decoder.payload_source_index(),
            flags: decoder.flags(),
            decoder,
        }))
    }
}

/// Recovers header-level information without decoding any payload rows.
pub fn decode_metadata_only(sources: &[SourceImage<'_>]) -> Result<MetadataSummary> {
    let (group, _) = assemble(sources)?;
    let header = &group[0].header;

    Ok(MetadataSummary {
        metadata: header.metadata.clone(),
        channel_mode: header.channel_mode,
        sample_rate: header.sample_rate,
        total: header.total,
        salt: header.salt,
        total_images: header.total_images,
        images_present: group.len(),
    })
}

/// Builds the streaming decoder for an audio source set without bulk
/// decoding it.
pub fn load<'a>(sources: &'a [SourceImage<'a>]) -> Result<StreamingAudioDecoder<'a>> {
    let (group, flags) = assemble(sources)?;
    if group[0].header.channel_mode == ChannelMode::Binary {
        return pxf_core::errors::decode_error("pxf: binary payloads have no streaming decoder");
    }
    build_audio_decoder(group, flags)
}

fn decode_binary(group: &[ParsedImage<'_>], mut flags: ValidationFlags) -> Result<BinaryDecodeResult> {
    let mut bytes = Vec::new();
    let mut valid_checksum = true;

    for image in group {
        let chunk_len = image.header.total as usize;
        validate!(chunk_len <= image.payload_rows() * BINARY_ROW_BYTES);

        let mut remaining = chunk_len;
        let mut row = 0usize;
        while remaining > 0 {
            let decoded =
                binary::decode_row(image.source.data, image.source.width, 2 + row, row);

            if decoded.osd {
                flags |= ValidationFlags::OSD_USED;
            }
            if !decoded.crc_ok {
                log::warn!(
                    "image {} row {} failed its checksum",
                    image.header.image_index,
                    row
                );
                valid_checksum = false;
                flags |= ValidationFlags::CHECKSUM_FAILED;
            }

            let take = remaining.min(BINARY_ROW_BYTES);
            bytes.extend_from_slice(&decoded.bytes[..take]);
            remaining -= take;
            row += 1;
        }
    }

    Ok(BinaryDecodeResult {
        bytes,
        metadata: group[0].header.metadata.clone(),
        valid_checksum,
        flags,
    })
}

fn build_audio_decoder<'a>(
    group: Vec<ParsedImage<'a>>,
    mut flags: ValidationFlags,
) -> Result<StreamingAudioDecoder<'a>> {
    let header = group[0].header.clone();
    let stereo = group.iter().any(|p| {
        matches!(p.header.channel_mode, ChannelMode::StereoMid | ChannelMode::StereoSide)
    });

    // All images of one payload must agree on the audio parameters.
    for image in &group {
        if image.header.sample_rate != header.sample_rate || image.header.total != header.total {
            return Err(Error::StereoMidSideMismatch);
        }
    }

    let total_images = header.total_images as usize;
    let total_samples = header.total as usize;
    let total_blocks = total_samples.div_ceil(HOP) + 1;

    // The per-image block capacity comes from the tallest image present;
    // only the final image of a channel may be shorter.
    let blocks_per_image =
        group.iter().map(|p| p.payload_rows() * DATA_BLOCKS_PER_ROW).max().unwrap();

    let channels = if stereo {
        if group.iter().all(|p| p.header.channel_mode == ChannelMode::StereoSide) {
            return Err(Error::SideOnly);
        }

        validate_stereo_indices(&group, total_images)?;

        let chunks = total_blocks.div_ceil(blocks_per_image).max(total_images / 2);
        let mut mid: Vec<Option<&SourceImage<'_>>> = vec![None; chunks];
        let mut side: Vec<Option<&SourceImage<'_>>> = vec![None; chunks];

        for image in &group {
            let index = image.header.image_index as usize;
            let chunk = (index - 1) / 2;
            if chunk < chunks {
                if index % 2 == 1 {
                    mid[chunk] = Some(image.source);
                }
                else {
                    side[chunk] = Some(image.source);
                }
            }
        }

        for chunk in 0..chunks {
            if mid[chunk].is_some() && side[chunk].is_none() {
                log::warn!("mid image {} has no side partner; duplicating mid", 2 * chunk + 1);
                flags |= ValidationFlags::SIDE_MISSING;
            }
        }

        vec![
            (ChannelMode::StereoMid, mid),
            (ChannelMode::StereoSide, side),
        ]
    }
    else {
        if group.iter().any(|p| p.header.channel_mode != ChannelMode::Mono) {
            return Err(Error::StereoMidSideMismatch);
        }

        let chunks = total_blocks.div_ceil(blocks_per_image).max(total_images);
        let mut images: Vec<Option<&SourceImage<'_>>> = vec![None; chunks];
        for image in &group {
            let index = image.header.image_index as usize;
            validate!(index >= 1);
            if index - 1 < chunks {
                images[index - 1] = Some(image.source);
            }
        }
        vec![(ChannelMode::Mono, images)]
    };

    let mut decoder = StreamingAudioDecoder::new(
        channels,
        header.sample_rate,
        total_samples,
        header.salt,
        blocks_per_image,
    );
    decoder.attach_payload_info(
        header.metadata.clone(),
        header.salt,
        group[0].input_index,
        flags,
    );
    Ok(decoder)
}

/// Stereo sets must pair odd mid indices with even side indices below an
/// even image total.
fn validate_stereo_indices(group: &[ParsedImage<'_>], total_images: usize) -> Result<()> {
    if total_images % 2 != 0 {
        return Err(Error::StereoMidSideMismatch);
    }

    for image in group {
        let index = image.header.image_index as usize;
        if index == 0 || index > total_images {
            return Err(Error::StereoMidSideMismatch);
        }
        let expected = if index % 2 == 1 { ChannelMode::StereoMid } else { ChannelMode::StereoSide };
        if image.header.channel_mode != expected {
            return Err(Error::StereoMidSideMismatch);
        }
    }

    Ok(())
}

