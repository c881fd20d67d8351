// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end audio roundtrip tests.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pxf_codec::{
    decode, DecodeResult, EncodeInput, EncodeOptions, Encoder, PxfImage, SourceImage,
};

fn sine(freq: f64, amplitude: f32, sample_rate: u32, duration: f64) -> Vec<f32> {
    let total = (f64::from(sample_rate) * duration) as usize;
    (0..total)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / f64::from(sample_rate)).sin() as f32)
        .collect()
}

fn rmse(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(a.len(), b.len());
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).powi(2))
        .sum();
    (sum / a.len() as f64).sqrt()
}

fn rms(a: &[f32]) -> f64 {
    (a.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>() / a.len() as f64).sqrt()
}

fn sources(images: &[PxfImage]) -> Vec<SourceImage<'_>> {
    images.iter().map(PxfImage::as_source).collect()
}

fn encode_mono(samples: &[f32], sample_rate: u32, options: EncodeOptions) -> Vec<PxfImage> {
    let channels = vec![samples.to_vec()];
    Encoder::new(options)
        .encode(EncodeInput::Audio { channels: &channels, sample_rate }, &Default::default())
        .unwrap()
}

fn decode_audio(images: &[PxfImage]) -> (Vec<Vec<f32>>, u32) {
    let sources = sources(images);
    match decode(&sources).unwrap() {
        DecodeResult::Audio(audio) => (audio.channels, audio.sample_rate),
        DecodeResult::Binary(_) => panic!("expected an audio payload"),
    }
}

#[test]
fn sine_roundtrip_across_rates_and_durations() {
    for &sample_rate in &[22050u32, 32000, 44100, 48000] {
        for &duration in &[0.25f64, 1.0, 20.0] {
            let samples = sine(440.0, 0.8, sample_rate, duration);
            let images = encode_mono(
                &samples,
                sample_rate,
                EncodeOptions { seed: Some(1), ..Default::default() },
            );

            let (channels, rate) = decode_audio(&images);
            assert_eq!(rate, sample_rate);
            assert_eq!(channels.len(), 1);
            assert_eq!(channels[0].len(), samples.len());

            let err = rmse(&channels[0], &samples);
            assert!(
                err <= 0.08,
                "{} Hz / {} s: RMSE {}",
                sample_rate,
                duration,
                err
            );
        }
    }
}

#[test]
fn silence_roundtrip_is_exact() {
    let samples = vec![0.0f32; 44100];
    let images = encode_mono(&samples, 44100, EncodeOptions { seed: Some(2), ..Default::default() });
    let (channels, _) = decode_audio(&images);
    assert!(rmse(&channels[0], &samples) <= 1e-8);
}

#[test]
fn white_noise_roundtrip() {
    let mut rng = SmallRng::seed_from_u64(11);
    let samples: Vec<f32> = (0..44100).map(|_| rng.gen_range(-0.5f32..0.5)).collect();

    let images = encode_mono(&samples, 44100, EncodeOptions { seed: Some(3), ..Default::default() });
    let (channels, _) = decode_audio(&images);

    let err = rmse(&channels[0], &samples);
    assert!(err <= 0.35, "white noise RMSE {}", err);
}

#[test]
fn seeded_encoder_output_is_byte_identical() {
    let samples = sine(440.0, 0.5, 44100, 0.3);
    let options = EncodeOptions { seed: Some(77), ..Default::default() };

    let a = encode_mono(&samples, 44100, options.clone());
    let b = encode_mono(&samples, 44100, options);

    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.name, y.name);
        assert_eq!(x.height, y.height);
        assert_eq!(x.data, y.data);
    }
}

#[test]
fn mono_scenario_single_image() {
    let samples = sine(440.0, 0.8, 44100, 0.1);
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("fn".to_string(), "mono".to_string());

    let channels = vec![samples.clone()];
    let images = Encoder::new(EncodeOptions { seed: Some(4), ..Default::default() })
        .encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &metadata)
        .unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].name, "mono.png");
    assert_eq!(images[0].width, 1024);

    let (decoded, rate) = decode_audio(&images);
    assert_eq!(rate, 44100);
    assert!(rmse(&decoded[0], &samples) <= 0.08);
}

#[test]
fn stereo_scenario_two_images() {
    let left = sine(440.0, 0.6, 44100, 0.1);
    let right = sine(523.0, 0.6, 44100, 0.1);
    let channels = vec![left.clone(), right.clone()];

    let images = Encoder::new(EncodeOptions { seed: Some(5), ..Default::default() })
        .encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &Default::default())
        .unwrap();

    assert_eq!(images.len(), 2);
    assert!(images[0].name.ends_with("_1_2.png"), "name {}", images[0].name);
    assert!(images[1].name.ends_with("_2_2.png"), "name {}", images[1].name);

    let (decoded, _) = decode_audio(&images);
    assert_eq!(decoded.len(), 2);
    assert!(rmse(&decoded[0], &left) <= 0.08);
    assert!(rmse(&decoded[1], &right) <= 0.08);
}

#[test]
fn long_stereo_splits_into_pairs_and_reassembles() {
    let left = sine(440.0, 0.7, 44100, 20.0);
    let right = sine(554.0, 0.7, 44100, 20.0);
    let channels = vec![left.clone(), right.clone()];

    let images = Encoder::new(EncodeOptions { max_height: 256, seed: Some(6) })
        .encode(EncodeInput::Audio { channels: &channels, sample_rate: 44100 }, &Default::default())
        .unwrap();

    assert_eq!(images.len(), 4, "expected two mid/side pairs");
    for image in &images {
        assert!(image.height <= 256);
    }

    // Decoding must not depend on input order.
    let mut shuffled: Vec<&PxfImage> = images.iter().collect();
    shuffled.swap(0, 3);
    shuffled.swap(1, 2);
    let shuffled_sources: Vec<SourceImage<'_>> =
        shuffled.iter().map(|image| image.as_source()).collect();

    let result = match decode(&shuffled_sources).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected an audio payload"),
    };

    assert_eq!(result.channels.len(), 2);
    assert_eq!(result.channels[0].len(), left.len());
    assert_eq!(result.channels[1].len(), right.len());
    assert!(rms(&result.channels[0]) > 0.1);
    assert!(rms(&result.channels[1]) > 0.1);
    assert!(rmse(&result.channels[0], &left) <= 0.08);
    assert!(rmse(&result.channels[1], &right) <= 0.08);
}

#[test]
fn missing_trailing_image_degrades_to_silence() {
    let samples = sine(440.0, 0.8, 44100, 2.0);
    let images = encode_mono(&samples, 44100, EncodeOptions { max_height: 40, seed: Some(10) });
    assert!(images.len() >= 2);

    // Decode with the final image withheld: the recovered head must still
    // match, the missing span decodes as silence, and the loss is flagged.
    let partial = vec![images[0].as_source()];
    let result = match decode(&partial).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected audio"),
    };

    assert!(result.flags.contains(pxf_codec::ValidationFlags::IMAGE_COUNT_MISMATCH));
    assert_eq!(result.channels[0].len(), samples.len());

    // The first image carries 372 blocks = 47616 samples; stay clear of the
    // boundary on both sides.
    let covered = 40_000;
    assert!(rmse(&result.channels[0][..covered], &samples[..covered]) <= 0.08);
    let tail = &result.channels[0][60_000..];
    assert!(rms(tail) < 1e-6, "withheld span should be silent");
}

#[test]
fn streaming_decoder_seek_matches_bulk_decode() {
    let samples = sine(440.0, 0.8, 32000, 1.0);
    let images = encode_mono(&samples, 32000, EncodeOptions { seed: Some(8), ..Default::default() });
    let sources = sources(&images);

    let mut result = match decode(&sources).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected an audio payload"),
    };

    let bulk = result.channels[0].clone();

    // Seek to an unaligned position and stream the rest in small chunks.
    let at = 10_000usize;
    result.decoder.seek(at);
    let mut streamed = Vec::new();
    loop {
        let chunk = result.decoder.decode_chunk(0.01);
        if chunk[0].is_empty() {
            break;
        }
        streamed.extend_from_slice(&chunk[0]);
    }

    assert_eq!(streamed.len(), bulk.len() - at);
    for (i, (&s, &b)) in streamed.iter().zip(&bulk[at..]).enumerate() {
        assert_eq!(s, b, "sample {} diverged after seek", i);
    }
}

#[test]
fn load_builds_streaming_decoder_without_bulk_decode() {
    let samples = sine(440.0, 0.8, 44100, 0.5);
    let images =
        encode_mono(&samples, 44100, EncodeOptions { seed: Some(12), ..Default::default() });
    let sources = sources(&images);

    let mut decoder = pxf_codec::load(&sources).unwrap();
    assert_eq!(decoder.sample_rate(), 44100);
    assert_eq!(decoder.total_samples(), samples.len());
    assert!(!decoder.is_stereo());

    let chunk = decoder.decode_chunk(0.1);
    assert_eq!(chunk.len(), 1);
    assert_eq!(chunk[0].len(), 4410);
    assert!(rmse(&chunk[0], &samples[..4410]) <= 0.08);
}

#[test]
fn load_rejects_binary_payloads() {
    let images = Encoder::new(EncodeOptions { seed: Some(13), ..Default::default() })
        .encode(EncodeInput::Bytes(&[1, 2, 3]), &Default::default())
        .unwrap();
    let sources = sources(&images);
    assert!(pxf_codec::load(&sources).is_err());
}

#[test]
fn streaming_decoder_reports_block_stats() {
    let samples = sine(440.0, 0.8, 44100, 0.25);
    let images = encode_mono(&samples, 44100, EncodeOptions { seed: Some(9), ..Default::default() });
    let sources = sources(&images);

    let mut result = match decode(&sources).unwrap() {
        DecodeResult::Audio(audio) => audio,
        DecodeResult::Binary(_) => panic!("expected an audio payload"),
    };

    let stats = result.decoder.stats_at(0).expect("stats for the first block");
    assert!(stats.luma_scale.is_finite() && stats.luma_scale > 0.0);
    assert!(stats.chroma_scale.is_finite() && stats.chroma_scale > 0.0);
    for factor in stats.band_factors {
        assert!(factor >= 0.0 && factor <= 2.0 + 1e-6);
    }

    assert!(result.decoder.stats_at(1_000_000).is_none());
}
