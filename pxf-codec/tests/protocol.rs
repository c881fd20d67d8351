// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol-level tests: metadata, error-correction margins, rejection
//! rules, and salt grouping.

use std::collections::BTreeMap;

use pxf_codec::ldpc::{binary_code, header_code, row_meta_code, LdpcCode};
use pxf_codec::{
    decode, DecodeResult, EncodeInput, EncodeOptions, Encoder, Error, PxfImage, SourceImage,
};
use pxf_core::rng::XorShift128P;

fn sources(images: &[PxfImage]) -> Vec<SourceImage<'_>> {
    images.iter().map(PxfImage::as_source).collect()
}

fn tone(len: usize) -> Vec<Vec<f32>> {
    vec![(0..len).map(|i| 0.5 * (i as f32 * 0.07).sin()).collect()]
}

fn encode_audio(channels: &[Vec<f32>], seed: u32) -> Vec<PxfImage> {
    Encoder::new(EncodeOptions { seed: Some(seed), ..Default::default() })
        .encode(EncodeInput::Audio { channels, sample_rate: 44100 }, &Default::default())
        .unwrap()
}

#[test]
fn metadata_roundtrips_sorted() {
    let mut metadata = BTreeMap::new();
    metadata.insert("artist".to_string(), "Test".to_string());
    metadata.insert("album".to_string(), "Test".to_string());
    metadata.insert("title".to_string(), "Song".to_string());
    metadata.insert("year".to_string(), "2024".to_string());
    metadata.insert("unicode_test".to_string(), "日本語🎵".to_string());

    let channels = tone(4410);
    let images = Encoder::new(EncodeOptions { seed: Some(1), ..Default::default() })
        .encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &metadata)
        .unwrap();

    let sources = sources(&images);
    let result = match decode(&sources).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected audio"),
    };

    assert_eq!(result.metadata, metadata);
    // The ordered map serializes keys in lexicographic order.
    let keys: Vec<&String> = result.metadata.keys().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn metadata_limits_fail_before_encoding() {
    let encoder = Encoder::new(EncodeOptions { seed: Some(1), ..Default::default() });
    let channels = tone(4410);

    let mut metadata = BTreeMap::new();
    metadata.insert("k".repeat(16), "v".to_string());
    assert!(matches!(
        encoder.encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &metadata),
        Err(Error::Metadata(pxf_core::errors::MetadataErrorKind::KeyTooLong))
    ));

    let mut metadata = BTreeMap::new();
    metadata.insert("key".to_string(), "v".repeat(4096));
    assert!(matches!(
        encoder.encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &metadata),
        Err(Error::Metadata(pxf_core::errors::MetadataErrorKind::ValueTooLong))
    ));

    // About 800 serialized bytes from entries that are each individually
    // legal.
    let mut metadata = BTreeMap::new();
    for i in 0..4 {
        metadata.insert(format!("key_{}", i), "x".repeat(190));
    }
    assert!(matches!(
        encoder.encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &metadata),
        Err(Error::Metadata(pxf_core::errors::MetadataErrorKind::TooLarge))
    ));
}

/// Encodes deterministic data with the codec's own PRNG, injects bit flips,
/// and soft-decodes with channel LLRs of magnitude 10.
fn flip_and_decode(code: &LdpcCode, seed: u32, flips: usize) -> bool {
    let mut rng = XorShift128P::new(seed);

    let data: Vec<u8> = (0..code.k()).map(|_| rng.next_byte() & 1).collect();
    let codeword = code.encode_bits(&data).unwrap();
    let mut llr: Vec<f64> =
        codeword.iter().map(|&b| if b == 0 { 10.0 } else { -10.0 }).collect();

    let mut flipped = vec![false; code.n()];
    let mut count = 0;
    while count < flips {
        let at = (rng.next32() as usize) % code.n();
        if !flipped[at] {
            flipped[at] = true;
            llr[at] = -llr[at];
            count += 1;
        }
    }

    let decoded = code.decode(&llr);
    decoded.corrected && decoded.bits == data
}

#[test]
fn ldpc_codes_correct_calibrated_flip_counts() {
    // Flip counts are chosen per code; the short high-rate codes hold far
    // fewer correctable errors than their parity-bit count suggests.
    assert!(flip_and_decode(row_meta_code(), 0x1111_1111, 3));
    assert!(flip_and_decode(header_code(), 0x2222_2222, 100));
    assert!(flip_and_decode(binary_code(), 0x3333_3333, 4));
}

#[test]
fn ldpc_clean_channels_converge_immediately() {
    for code in [row_meta_code(), header_code(), binary_code()] {
        assert!(flip_and_decode(code, 0x4444_4444, 0));
    }
}

#[test]
fn mixed_audio_and_binary_is_rejected() {
    let audio = encode_audio(&tone(4410), 1);
    let binary = Encoder::new(EncodeOptions { seed: Some(2), ..Default::default() })
        .encode(EncodeInput::Bytes(&[1, 2, 3, 4]), &Default::default())
        .unwrap();

    let mixed: Vec<SourceImage<'_>> =
        audio.iter().chain(binary.iter()).map(PxfImage::as_source).collect();

    assert!(matches!(decode(&mixed), Err(Error::MixedAudioBinary)));
}

#[test]
fn empty_source_set_is_rejected() {
    let empty: Vec<SourceImage<'_>> = Vec::new();
    assert!(matches!(decode(&empty), Err(Error::NoSources)));
}

#[test]
fn side_only_set_is_rejected() {
    let left: Vec<f32> = (0..4410).map(|i| 0.4 * (i as f32 * 0.05).sin()).collect();
    let right: Vec<f32> = (0..4410).map(|i| 0.4 * (i as f32 * 0.06).sin()).collect();
    let images = encode_audio(&[left, right].to_vec(), 3);
    assert_eq!(images.len(), 2);

    // Keep only the side image (even index).
    let side_only = vec![images[1].as_source()];
    assert!(matches!(decode(&side_only), Err(Error::SideOnly)));
}

#[test]
fn invalid_width_is_rejected() {
    let data = vec![0u8; 512 * 24 * 4];
    let bad = [SourceImage { data: &data, width: 512, height: 24 }];
    assert!(matches!(decode(&bad), Err(Error::InvalidImageWidth(512))));
}

#[test]
fn corrupted_checksum_blocks_are_rejected() {
    let mut images = encode_audio(&tone(4410), 4);

    // Invert the stored checksum bits in the tail of the text row.
    let image = &mut images[0];
    for x in (1024 - 32)..1024 {
        for y in 8..16 {
            let at = (y * 1024 + x) * 4;
            image.data[at] ^= 0xFF;
            image.data[at + 1] ^= 0xFF;
            image.data[at + 2] ^= 0xFF;
        }
    }

    let sources = sources(&images);
    assert!(matches!(decode(&sources), Err(Error::HeaderChecksumInvalid)));
}

#[test]
fn mismatched_stereo_pair_is_rejected() {
    // Two different clips encoded with the same seed share a salt, so the
    // cross-paired images land in one group and must fail pair validation.
    let clip_a = {
        let left: Vec<f32> = (0..22050).map(|i| 0.5 * (i as f32 * 0.04).sin()).collect();
        let right = left.clone();
        encode_audio(&[left, right].to_vec(), 9)
    };
    let clip_b = {
        let left: Vec<f32> = (0..11025).map(|i| 0.5 * (i as f32 * 0.09).sin()).collect();
        let right = left.clone();
        encode_audio(&[left, right].to_vec(), 9)
    };

    let cross = vec![clip_a[0].as_source(), clip_b[1].as_source()];
    assert!(matches!(decode(&cross), Err(Error::StereoMidSideMismatch)));
}

#[test]
fn largest_salt_group_wins() {
    let payload_small = vec![0xAAu8; 100];
    let payload_large = vec![0x55u8; 200 * 1024];

    let small = Encoder::new(EncodeOptions { seed: Some(20), ..Default::default() })
        .encode(EncodeInput::Bytes(&payload_small), &Default::default())
        .unwrap();
    let large = Encoder::new(EncodeOptions { max_height: 256, seed: Some(21) })
        .encode(EncodeInput::Bytes(&payload_large), &Default::default())
        .unwrap();
    assert!(large.len() > small.len());

    let mixed: Vec<SourceImage<'_>> =
        small.iter().chain(large.iter()).map(PxfImage::as_source).collect();

    let result = match decode(&mixed).unwrap() {
        DecodeResult::Binary(binary) => binary,
        DecodeResult::Audio(_) => panic!("expected binary"),
    };

    assert_eq!(result.bytes, payload_large);
    assert!(result.flags.contains(pxf_codec::ValidationFlags::GROUP_DISCARDED));
}

#[test]
fn missing_side_image_duplicates_mid() {
    let left: Vec<f32> = (0..8820).map(|i| 0.5 * (i as f32 * 0.03).sin()).collect();
    let right: Vec<f32> = (0..8820).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect();
    let images = encode_audio(&[left, right].to_vec(), 30);
    assert_eq!(images.len(), 2);

    // Drop the side image; both output channels must carry the mid signal.
    let mid_only = vec![images[0].as_source()];
    let result = match decode(&mid_only).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected audio"),
    };

    assert_eq!(result.channels.len(), 2);
    assert!(result.flags.contains(pxf_codec::ValidationFlags::SIDE_MISSING));
    for (l, r) in result.channels[0].iter().zip(&result.channels[1]) {
        assert_eq!(l, r);
    }
}
