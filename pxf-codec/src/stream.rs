// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `stream` module implements the seekable streaming audio decoder.
//!
//! Blocks of one channel form a single continuous stream across its images;
//! each decoded block contributes one hop of output through the overlap-add
//! delay line. Seeking zeroes the delay line and re-primes it by decoding
//! the block containing the target sample.

use std::collections::HashMap;

use crate::common::{
    ChannelMode, DATA_BLOCKS_PER_ROW, HOP, NUM_BINS, SUBGROUP_BLOCKS, QUADRANT_BLOCKS, WINDOW_LEN,
};
use crate::decoder::{SourceImage, ValidationFlags};
use crate::header::MetadataMap;
use crate::row::audio::{AudioRowCodec, NoiseContext};
use crate::row::{read_row_metadata, RowMetadata};

/// Visualization statistics of one audio block.
#[derive(Clone, Copy, Debug)]
pub struct BlockStats {
    pub luma_scale: f32,
    pub chroma_scale: f32,
    pub band_factors: [f32; 4],
    pub sbr_bytes: [u8; 8],
}

/// One channel's image sequence; a slot is `None` when that image was absent
/// from the source set.
struct ChannelImages<'a> {
    mode: ChannelMode,
    images: Vec<Option<&'a SourceImage<'a>>>,
}

struct CachedRow {
    chunk: usize,
    row: usize,
    spectra: Vec<[f64; NUM_BINS]>,
}

/// A seekable decoder over one audio payload. It borrows the caller's source
/// images and never outlives them.
pub struct StreamingAudioDecoder<'a> {
    channels: Vec<ChannelImages<'a>>,
    sample_rate: u32,
    total_samples: usize,
    salt: u32,
    blocks_per_image: usize,

    codec: AudioRowCodec,
    meta_cache: HashMap<(usize, usize, usize), RowMetadata>,
    // One decoded row per channel; mid and side advance in lockstep.
    row_cache: Vec<Option<CachedRow>>,
    flags: ValidationFlags,

    metadata: MetadataMap,
    salt_bytes: [u8; 4],
    source_index: usize,

    // Overlap-add state per channel, plus the streaming cursor.
    overlap: Vec<[f64; HOP]>,
    next_block: usize,
    pending_skip: usize,
    position: usize,

    // Output samples produced past what the last decode call consumed.
    carry: Vec<Vec<f32>>,
}

impl<'a> StreamingAudioDecoder<'a> {
    pub(crate) fn new(
        channel_images: Vec<(ChannelMode, Vec<Option<&'a SourceImage<'a>>>)>,
        sample_rate: u32,
        total_samples: usize,
        salt: [u8; 4],
        blocks_per_image: usize,
    ) -> StreamingAudioDecoder<'a> {
        let channels: Vec<ChannelImages<'a>> = channel_images
            .into_iter()
            .map(|(mode, images)| ChannelImages { mode, images })
            .collect();
        let overlap = vec![[0.0; HOP]; channels.len()];
        let row_cache = (0..channels.len()).map(|_| None).collect();

        let mut decoder = StreamingAudioDecoder {
            channels,
            sample_rate,
            total_samples,
            salt: u32::from_le_bytes(salt),
            blocks_per_image,
            codec: AudioRowCodec::new(sample_rate),
            meta_cache: HashMap::new(),
            row_cache,
            flags: ValidationFlags::empty(),
            metadata: MetadataMap::new(),
            salt_bytes: salt,
            source_index: 0,
            overlap,
            next_block: 0,
            pending_skip: 0,
            position: 0,
            carry: Vec::new(),
        };
        decoder.seek(0);
        decoder
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per decoded channel.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// True when the payload decodes to two output channels.
    pub fn is_stereo(&self) -> bool {
        self.channels.len() == 2
    }

    /// Validation state accumulated by the decoding done so far.
    pub fn flags(&self) -> ValidationFlags {
        self.flags
    }

    pub(crate) fn attach_payload_info(
        &mut self,
        metadata: MetadataMap,
        salt: [u8; 4],
        source_index: usize,
        flags: ValidationFlags,
    ) {
        self.metadata = metadata;
        self.salt_bytes = salt;
        self.source_index = source_index;
        self.flags |= flags;
    }

    /// The metadata mapping of the decoded payload.
    pub fn payload_metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn payload_salt(&self) -> [u8; 4] {
        self.salt_bytes
    }

    /// Input position of the first image of the decoded group.
    pub fn payload_source_index(&self) -> usize {
        self.source_index
    }

    /// Total blocks in each channel's stream, including the priming block.
    fn total_blocks(&self) -> usize {
        self.total_samples.div_ceil(HOP) + 1
    }

    /// Moves the cursor to `sample`, resetting the overlap delay line and
    /// decoding one block to re-prime it.
    pub fn seek(&mut self, sample: usize) {
        let sample = sample.min(self.total_samples);
        let hop = sample / HOP;

        for overlap in self.overlap.iter_mut() {
            overlap.fill(0.0);
        }

        for channel in 0..self.channels.len() {
            let frame = self.decode_block_frame(channel, hop);
            self.overlap[channel].copy_from_slice(&frame[HOP..]);
        }

        self.next_block = hop + 1;
        self.pending_skip = sample - hop * HOP;
        self.position = sample;
        self.carry.clear();
    }

    /// Decodes approximately `seconds` of audio from the cursor. Returns one
    /// buffer per output channel (left/right for stereo payloads); buffers
    /// are empty at end of stream.
    pub fn decode_chunk(&mut self, seconds: f64) -> Vec<Vec<f32>> {
        let wanted = (seconds * f64::from(self.sample_rate)).round().max(0.0) as usize;
        self.decode_samples(wanted)
    }

    /// Decodes the whole payload from the beginning.
    pub fn decode_all(&mut self) -> Vec<Vec<f32>> {
        self.seek(0);
        self.decode_samples(self.total_samples)
    }

    /// Visualization statistics for a data block of the first channel, or
    /// `None` past the end of the stream.
    pub fn stats_at(&mut self, global_block: usize) -> Option<BlockStats> {
        if global_block >= self.total_blocks() || self.channels.is_empty() {
            return None;
        }

        let chunk = global_block / self.blocks_per_image;
        let local = global_block % self.blocks_per_image;
        let row = local / DATA_BLOCKS_PER_ROW;
        let block = local % DATA_BLOCKS_PER_ROW;

        let meta = self.row_metadata(0, chunk, row);
        let subgroup = block / SUBGROUP_BLOCKS;
        let quadrant = (block % SUBGROUP_BLOCKS) / QUADRANT_BLOCKS;

        let mut sbr_bytes = [0u8; 8];
        sbr_bytes[..4].copy_from_slice(&meta.sbr_words[0].to_be_bytes());
        sbr_bytes[4..].copy_from_slice(&meta.sbr_words[1].to_be_bytes());

        Some(BlockStats {
            luma_scale: meta.scale_y[subgroup],
            chroma_scale: meta.scale_c[subgroup][quadrant],
            band_factors: [
                meta.band_factor(subgroup, 0) as f32,
                meta.band_factor(subgroup, 1) as f32,
                meta.band_factor(subgroup, 2) as f32,
                meta.band_factor(subgroup, 3) as f32,
            ],
            sbr_bytes,
        })
    }

    fn decode_samples(&mut self, wanted: usize) -> Vec<Vec<f32>> {
        let stereo = self.is_stereo();
        let out_channels = if stereo { 2 } else { 1 };
        let mut out = vec![Vec::with_capacity(wanted); out_channels];

        // Samples already produced by a previous call come first.
        if let Some(carried) = self.take_carry(wanted) {
            out = carried;
        }

        let mut hop_out = vec![[0.0f64; HOP]; self.channels.len()];

        while out[0].len() < wanted {
            let g = self.next_block;
            let hop_start = (g - 1) * HOP;
            if hop_start >= self.total_samples {
                break;
            }

            for channel in 0..self.channels.len() {
                let frame = self.decode_block_frame(channel, g);
                for n in 0..HOP {
                    hop_out[channel][n] = self.overlap[channel][n] + frame[n];
                }
                self.overlap[channel].copy_from_slice(&frame[HOP..]);
            }
            self.next_block += 1;

            let take_from = self.pending_skip;
            self.pending_skip = 0;

            let hop_end = (hop_start + HOP).min(self.total_samples);
            for n in (hop_start + take_from)..hop_end {
                let at = n - hop_start;
                let target = if out[0].len() < wanted { &mut out } else { &mut self.carry };
                if target.len() < out_channels {
                    target.resize(out_channels, Vec::new());
                }
                if stereo {
                    let mid = hop_out[0][at];
                    let side = hop_out[1][at];
                    target[0].push((mid + side) as f32);
                    target[1].push((mid - side) as f32);
                }
                else {
                    target[0].push(hop_out[0][at] as f32);
                }
            }
        }

        self.position += out[0].len();
        out
    }

    /// Moves up to `wanted` carried samples into a fresh output buffer.
    fn take_carry(&mut self, wanted: usize) -> Option<Vec<Vec<f32>>> {
        if self.carry.is_empty() || self.carry[0].is_empty() {
            return None;
        }

        let take = self.carry[0].len().min(wanted);
        let mut out = Vec::with_capacity(self.carry.len());
        for channel in self.carry.iter_mut() {
            let rest = channel.split_off(take);
            out.push(std::mem::replace(channel, rest));
        }
        Some(out)
    }

    /// Decodes one block of one channel into its windowed 256-sample frame.
    fn decode_block_frame(&mut self, channel: usize, global_block: usize) -> Vec<f64> {
        let chunk = global_block / self.blocks_per_image;
        let local = global_block % self.blocks_per_image;
        let row = local / DATA_BLOCKS_PER_ROW;
        let block = local % DATA_BLOCKS_PER_ROW;

        self.ensure_row(channel, chunk, row);

        let mut frame = vec![0.0; WINDOW_LEN];
        if let Some(cached) = &self.row_cache[channel] {
            let spectrum = cached.spectra[block];
            self.codec.synthesize_frame(&spectrum, &mut frame);
        }
        frame
    }

    /// Makes sure a channel's row cache holds the decoded spectra of the
    /// given row.
    fn ensure_row(&mut self, channel: usize, chunk: usize, row: usize) {
        if let Some(cached) = &self.row_cache[channel] {
            if cached.chunk == chunk && cached.row == row {
                return;
            }
        }

        let meta = self.row_metadata(channel, chunk, row);

        let spectra = match self.channels[channel].images.get(chunk).copied().flatten() {
            Some(image) if row + 2 < image.height as usize / 8 => {
                let noise = NoiseContext {
                    salt: self.salt,
                    chunk_index: chunk as u32,
                    channel_mode: self.channels[channel].mode.as_u8(),
                };
                self.codec.decode_row(
                    image.data,
                    image.width,
                    2 + row,
                    &meta,
                    &noise,
                    (row * DATA_BLOCKS_PER_ROW) as u32,
                )
            }
            // A missing image or out-of-range row decodes as silence.
            _ => vec![[0.0; NUM_BINS]; DATA_BLOCKS_PER_ROW],
        };

        self.row_cache[channel] = Some(CachedRow { chunk, row, spectra });
    }

    /// Reads (or recalls) the metadata of one row.
    fn row_metadata(&mut self, channel: usize, chunk: usize, row: usize) -> RowMetadata {
        let key = (channel, chunk, row);
        if let Some(meta) = self.meta_cache.get(&key) {
            return *meta;
        }

        let meta = match self.channels.get(channel).and_then(|ch| ch.images.get(chunk)).copied().flatten() {
            Some(image) if row + 2 < image.height as usize / 8 => {
                let read = read_row_metadata(image.data, image.width, 2 + row, row);
                if read.fallback {
                    self.flags |= ValidationFlags::ROW_FALLBACK;
                }
                if read.osd {
                    self.flags |= ValidationFlags::OSD_USED;
                }
                read.meta
            }
            _ => RowMetadata::neutral(),
        };

        self.meta_cache.insert(key, meta);
        meta
    }
}
