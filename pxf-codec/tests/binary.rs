// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end binary payload tests.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pxf_codec::{decode, DecodeResult, EncodeInput, EncodeOptions, Encoder, PxfImage, SourceImage};

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

fn sources(images: &[PxfImage]) -> Vec<SourceImage<'_>> {
    images.iter().map(PxfImage::as_source).collect()
}

fn decode_binary(images: &[PxfImage]) -> pxf_codec::BinaryDecodeResult {
    let sources = sources(images);
    match decode(&sources).unwrap() {
        DecodeResult::Binary(binary) => binary,
        DecodeResult::Audio(_) => panic!("expected a binary payload"),
    }
}

#[test]
fn byte_roundtrip_at_varied_lengths() {
    // Lengths straddling the row and block boundaries.
    for &len in &[1usize, 19, 200, 2479, 2480, 2481, 24800] {
        let payload = random_bytes(len, len as u64);
        let images = Encoder::new(EncodeOptions { seed: Some(1), ..Default::default() })
            .encode(EncodeInput::Bytes(&payload), &Default::default())
            .unwrap();
        assert_eq!(images.len(), 1);

        let result = decode_binary(&images);
        assert!(result.valid_checksum, "len {}", len);
        assert_eq!(result.bytes, payload, "len {}", len);
    }
}

#[test]
fn small_payload_single_image_scenario() {
    let payload = random_bytes(200, 42);
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("fn".to_string(), "bin".to_string());

    let images = Encoder::new(EncodeOptions { seed: Some(2), ..Default::default() })
        .encode(EncodeInput::Bytes(&payload), &metadata)
        .unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].name, "bin.png");

    let result = decode_binary(&images);
    assert!(result.valid_checksum);
    assert_eq!(result.bytes, payload);
    assert_eq!(result.metadata.get("fn").map(String::as_str), Some("bin"));
}

#[test]
fn large_payload_splits_and_reassembles_in_any_order() {
    let payload = random_bytes(100 * 1024, 7);
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("fn".to_string(), "random".to_string());

    let images = Encoder::new(EncodeOptions { max_height: 256, seed: Some(3) })
        .encode(EncodeInput::Bytes(&payload), &metadata)
        .unwrap();

    assert!(images.len() > 1, "100 KiB at height 256 must span multiple images");
    for (i, image) in images.iter().enumerate() {
        assert!(image.height <= 256);
        assert_eq!(image.name, format!("random_{}_{}.png", i + 1, images.len()));
    }

    // Reverse the image order; assembly must sort by image index.
    let reversed: Vec<&PxfImage> = images.iter().rev().collect();
    let reversed_sources: Vec<SourceImage<'_>> =
        reversed.iter().map(|image| image.as_source()).collect();

    let result = match decode(&reversed_sources).unwrap() {
        DecodeResult::Binary(binary) => binary,
        DecodeResult::Audio(_) => panic!("expected a binary payload"),
    };

    assert!(result.valid_checksum);
    assert_eq!(result.bytes, payload);
}

#[test]
fn decode_metadata_only_skips_payload() {
    let payload = random_bytes(5000, 9);
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("fn".to_string(), "meta".to_string());
    metadata.insert("artist".to_string(), "Nobody".to_string());

    let images = Encoder::new(EncodeOptions { seed: Some(4), ..Default::default() })
        .encode(EncodeInput::Bytes(&payload), &metadata)
        .unwrap();

    let sources = sources(&images);
    let summary = pxf_codec::decode_metadata_only(&sources).unwrap();
    assert_eq!(summary.channel_mode, pxf_codec::ChannelMode::Binary);
    assert_eq!(summary.total, 5000);
    assert_eq!(summary.total_images, 1);
    assert_eq!(summary.metadata, metadata);
}
