// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The encoder entry point: input validation, chunking across images,
//! mid/side conversion, and the per-image framing loop.

use std::time::{SystemTime, UNIX_EPOCH};

use pxf_core::errors::{Error, Result};
use pxf_core::rng::XorShift128P;
use pxf_core::util::bits;

use crate::common::{
    xor_whiten, ChannelMode, BINARY_ROW_BYTES, BLOCK_DIM, DATA_BLOCKS_PER_ROW,
    DEFAULT_MAX_HEIGHT, HEADER_XOR_MASK_SEED, HOP,
};
use crate::header::{serialize_metadata, Header, MetadataMap};
use crate::image::PxfImage;
use crate::ldpc;
use crate::row::audio::AudioRowCodec;
use crate::row::{binary, write_row_metadata};
use crate::text;

/// The payload to encode. Audio and binary inputs are mutually exclusive by
/// construction.
pub enum EncodeInput<'a> {
    Audio {
        /// One or two channels of equal length, values nominally in [-1, 1].
        channels: &'a [Vec<f32>],
        sample_rate: u32,
    },
    Bytes(&'a [u8]),
}

#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Upper bound on emitted image heights. Payloads that do not fit are
    /// split across multiple images.
    pub max_height: u32,
    /// Seeds the salt and therefore makes the entire output deterministic.
    /// When absent the salt is drawn from the clock.
    pub seed: Option<u32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions { max_height: DEFAULT_MAX_HEIGHT, seed: None }
    }
}

pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Encoder {
        Encoder { options }
    }

    pub fn encode(&self, input: EncodeInput<'_>, metadata: &MetadataMap) -> Result<Vec<PxfImage>> {
        self.encode_with_progress(input, metadata, &mut |_| ())
    }

    /// Encodes with a progress callback receiving a percentage in [0, 100],
    /// invoked every five rows and on completion.
    pub fn encode_with_progress(
        &self,
        input: EncodeInput<'_>,
        metadata: &MetadataMap,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<PxfImage>> {
        // Metadata limit errors surface before any encoding work.
        serialize_metadata(metadata)?;

        let rows_per_image = self.usable_rows()?;
        let salt = self.salt();

        match input {
            EncodeInput::Audio { channels, sample_rate } => {
                self.encode_audio(channels, sample_rate, metadata, salt, rows_per_image, progress)
            }
            EncodeInput::Bytes(bytes) => {
                self.encode_binary(bytes, metadata, salt, rows_per_image, progress)
            }
        }
    }

    fn usable_rows(&self) -> Result<usize> {
        let block_rows = (self.options.max_height as usize) / BLOCK_DIM;
        if block_rows < 3 {
            return Err(Error::InvalidImageHeight(self.options.max_height));
        }
        Ok(block_rows - 2)
    }

    fn salt(&self) -> [u8; 4] {
        let seed = self.options.seed.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            (nanos as u32) ^ ((nanos >> 32) as u32) ^ std::process::id()
        });
        let mut rng = XorShift128P::new(seed);
        [rng.next_byte(), rng.next_byte(), rng.next_byte(), rng.next_byte()]
    }

    fn encode_audio(
        &self,
        channels: &[Vec<f32>],
        sample_rate: u32,
        metadata: &MetadataMap,
        salt: [u8; 4],
        rows_per_image: usize,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<PxfImage>> {
        if channels.is_empty() || channels.iter().any(|ch| ch.is_empty()) {
            return Err(Error::NoData);
        }
        if channels.len() > 2 {
            return Err(Error::InvalidLength("more than two audio channels"));
        }
        if channels.len() == 2 && channels[0].len() != channels[1].len() {
            return Err(Error::InvalidLength("audio channel lengths differ"));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidLength("sample rate must be positive"));
        }

        let stereo = channels.len() == 2;
        let total_samples = channels[0].len();

        // Stereo is stored as mid/side so the side image degrades gracefully.
        let encoded_channels: Vec<(ChannelMode, Vec<f32>)> = if stereo {
            let (left, right) = (&channels[0], &channels[1]);
            let mid = left.iter().zip(right).map(|(&l, &r)| (l + r) * 0.5).collect();
            let side = left.iter().zip(right).map(|(&l, &r)| (l - r) * 0.5).collect();
            vec![(ChannelMode::StereoMid, mid), (ChannelMode::StereoSide, side)]
        }
        else {
            vec![(ChannelMode::Mono, channels[0].clone())]
        };

        // One extra block primes the overlap-add chain; block streams run
        // continuously across a channel's images.
        let total_blocks = total_samples.div_ceil(HOP) + 1;
        let blocks_per_image = rows_per_image * DATA_BLOCKS_PER_ROW;
        let images_per_channel = total_blocks.div_ceil(blocks_per_image);
        let total_images = encoded_channels.len() * images_per_channel;

        let total_rows: usize = (0..images_per_channel)
            .map(|k| {
                let blocks = (total_blocks - k * blocks_per_image).min(blocks_per_image);
                blocks.div_ceil(DATA_BLOCKS_PER_ROW)
            })
            .sum::<usize>()
            * encoded_channels.len();

        let mut codec = AudioRowCodec::new(sample_rate);
        let mut images = Vec::with_capacity(total_images);
        let mut rows_done = 0usize;

        for chunk in 0..images_per_channel {
            for (ch, (mode, samples)) in encoded_channels.iter().enumerate() {
                let image_index = (chunk * encoded_channels.len() + ch + 1) as u16;

                let blocks = (total_blocks - chunk * blocks_per_image).min(blocks_per_image);
                let rows = blocks.div_ceil(DATA_BLOCKS_PER_ROW);
                let height = ((rows + 2) * BLOCK_DIM) as u32;

                let header = Header {
                    sample_rate,
                    total: total_samples as u32,
                    channel_mode: *mode,
                    salt,
                    image_index,
                    total_images: total_images as u16,
                    metadata: metadata.clone(),
                };

                let name = image_name(metadata, image_index, total_images);
                let mut image = PxfImage::new(height, name);
                write_framing(&mut image, &header)?;

                for row in 0..rows {
                    let row_first_block = (chunk * blocks_per_image + row * DATA_BLOCKS_PER_ROW) as u64;
                    let meta = codec.encode_row(samples, row_first_block, &mut image, 2 + row);
                    write_row_metadata(&mut image, 2 + row, row, &meta);

                    rows_done += 1;
                    if rows_done % 5 == 0 {
                        progress(100.0 * rows_done as f64 / total_rows as f64);
                    }
                }

                images.push(image);
            }
        }

        progress(100.0);
        Ok(images)
    }

    fn encode_binary(
        &self,
        bytes: &[u8],
        metadata: &MetadataMap,
        salt: [u8; 4],
        rows_per_image: usize,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<PxfImage>> {
        if bytes.is_empty() {
            return Err(Error::NoData);
        }

        let chunk_capacity = rows_per_image * BINARY_ROW_BYTES;
        let total_images = bytes.len().div_ceil(chunk_capacity);
        let total_rows = bytes.len().div_ceil(BINARY_ROW_BYTES);

        let mut images = Vec::with_capacity(total_images);
        let mut rows_done = 0usize;

        for (index, chunk) in bytes.chunks(chunk_capacity).enumerate() {
            let rows = chunk.len().div_ceil(BINARY_ROW_BYTES);
            let height = ((rows + 2) * BLOCK_DIM) as u32;
            let image_index = (index + 1) as u16;

            let header = Header {
                sample_rate: 0,
                total: chunk.len() as u32,
                channel_mode: ChannelMode::Binary,
                salt,
                image_index,
                total_images: total_images as u16,
                metadata: metadata.clone(),
            };

            let name = image_name(metadata, image_index, total_images);
            let mut image = PxfImage::new(height, name);
            write_framing(&mut image, &header)?;

            let mut row_bytes = vec![0u8; BINARY_ROW_BYTES];
            for (row, payload) in chunk.chunks(BINARY_ROW_BYTES).enumerate() {
                // The final partial row is zero padded before LDPC and CRC.
                row_bytes.fill(0);
                row_bytes[..payload.len()].copy_from_slice(payload);
                binary::encode_row(&row_bytes, row, &mut image, 2 + row);

                rows_done += 1;
                if rows_done % 5 == 0 {
                    progress(100.0 * rows_done as f64 / total_rows as f64);
                }
            }

            images.push(image);
        }

        progress(100.0);
        Ok(images)
    }
}

/// Writes the header row, status line, and header checksum blocks.
fn write_framing(image: &mut PxfImage, header: &Header) -> Result<()> {
    let bytes = header.serialize()?;
    let checksum = Header::checksum(&bytes);

    let mut codeword = ldpc::header_code().encode_bytes(&bytes)?;
    xor_whiten(&mut codeword, HEADER_XOR_MASK_SEED);
    image.put_block_bits(0, 0, &bits::unpack_msb(&codeword));

    text::draw_status_line(image, 1, &status_line(header));
    image.put_block_bits(1, DATA_BLOCKS_PER_ROW, &bits::unpack_msb(&checksum));
    Ok(())
}

fn status_line(header: &Header) -> String {
    match header.channel_mode {
        ChannelMode::Binary => format!(
            "PXF300 BIN {}B {}/{}",
            header.total, header.image_index, header.total_images
        ),
        mode => {
            let mode = match mode {
                ChannelMode::Mono => "MONO",
                ChannelMode::StereoMid => "MID",
                _ => "SIDE",
            };
            format!(
                "PXF300 {} {}HZ {}/{}",
                mode, header.sample_rate, header.image_index, header.total_images
            )
        }
    }
}

fn image_name(metadata: &MetadataMap, image_index: u16, total_images: usize) -> String {
    let base = metadata.get("fn").map(String::as_str).unwrap_or("pxf");
    if total_images == 1 {
        format!("{}.png", base)
    }
    else {
        format!("{}_{}_{}.png", base, image_index, total_images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_rejects_empty_inputs() {
        let encoder = Encoder::new(EncodeOptions::default());
        let metadata = MetadataMap::new();

        assert!(matches!(
            encoder.encode(EncodeInput::Bytes(&[]), &metadata),
            Err(Error::NoData)
        ));
        assert!(matches!(
            encoder.encode(EncodeInput::Audio { channels: &[], sample_rate: 44100 }, &metadata),
            Err(Error::NoData)
        ));
    }

    #[test]
    fn verify_rejects_mismatched_channels() {
        let encoder = Encoder::new(EncodeOptions::default());
        let channels = vec![vec![0.0f32; 100], vec![0.0f32; 200]];
        assert!(matches!(
            encoder.encode(
                EncodeInput::Audio { channels: &channels, sample_rate: 44100 },
                &MetadataMap::new()
            ),
            Err(Error::InvalidLength(_))
        ));
    }

    #[test]
    fn verify_rejects_tiny_max_height() {
        let encoder =
            Encoder::new(EncodeOptions { max_height: 16, seed: Some(1) });
        assert!(matches!(
            encoder.encode(EncodeInput::Bytes(&[1, 2, 3]), &MetadataMap::new()),
            Err(Error::InvalidImageHeight(16))
        ));
    }

    #[test]
    fn verify_deterministic_salt() {
        let a = Encoder::new(EncodeOptions { max_height: 256, seed: Some(9) }).salt();
        let b = Encoder::new(EncodeOptions { max_height: 256, seed: Some(9) }).salt();
        assert_eq!(a, b);
    }

    #[test]
    fn verify_image_naming() {
        let mut metadata = MetadataMap::new();
        assert_eq!(image_name(&metadata, 1, 1), "pxf.png");
        assert_eq!(image_name(&metadata, 2, 4), "pxf_2_4.png");
        metadata.insert("fn".into(), "song".into());
        assert_eq!(image_name(&metadata, 1, 1), "song.png");
    }
}
