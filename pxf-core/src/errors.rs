// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// `MetadataErrorKind` is a list of reasons why a metadata mapping cannot be serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// The mapping contains more than 255 entries.
    TooManyEntries,
    /// A key exceeds 15 bytes of UTF-8.
    KeyTooLong,
    /// A value exceeds 4095 bytes of UTF-8.
    ValueTooLong,
    /// The serialized mapping exceeds the space reserved in the header.
    TooLarge,
}

impl MetadataErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            MetadataErrorKind::TooManyEntries => "too many metadata entries",
            MetadataErrorKind::KeyTooLong => "metadata key too long",
            MetadataErrorKind::ValueTooLong => "metadata value too long",
            MetadataErrorKind::TooLarge => "serialized metadata too large",
        }
    }
}

/// `Error` provides an enumeration of all possible errors reported by PXF.
#[derive(Debug)]
pub enum Error {
    /// The encoder was given no samples and no bytes to encode.
    NoData,
    /// The metadata mapping cannot be serialized.
    Metadata(MetadataErrorKind),
    /// The decoder was given an empty source set.
    NoSources,
    /// The source set mixes audio-mode and binary-mode images.
    MixedAudioBinary,
    /// The header failed checksum validation or could not be error-corrected.
    HeaderChecksumInvalid,
    /// The image carries a format version other than the supported one.
    UnsupportedVersion(u16),
    /// The image width is not the fixed wire width.
    InvalidImageWidth(u32),
    /// The image height is not a non-zero multiple of the block height.
    InvalidImageHeight(u32),
    /// Stereo mid/side partner images disagree on salt or sample count, or
    /// their index parity is wrong.
    StereoMidSideMismatch,
    /// The source set contains only side-channel images.
    SideOnly,
    /// An input buffer length does not match the fixed length an operation requires.
    InvalidLength(&'static str),
    /// The stream contained malformed data and could not be decoded.
    DecodeError(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::NoData => {
                write!(f, "no audio channels or byte payload provided")
            }
            Error::Metadata(ref kind) => {
                write!(f, "metadata error: {}", kind.as_str())
            }
            Error::NoSources => {
                write!(f, "no source images provided")
            }
            Error::MixedAudioBinary => {
                write!(f, "source set mixes audio and binary images")
            }
            Error::HeaderChecksumInvalid => {
                write!(f, "header checksum mismatch")
            }
            Error::UnsupportedVersion(version) => {
                write!(f, "unsupported format version: {}", version)
            }
            Error::InvalidImageWidth(width) => {
                write!(f, "invalid image width: {}", width)
            }
            Error::InvalidImageHeight(height) => {
                write!(f, "invalid image height: {}", height)
            }
            Error::StereoMidSideMismatch => {
                write!(f, "stereo mid/side images do not match")
            }
            Error::SideOnly => {
                write!(f, "source set contains only side-channel images")
            }
            Error::InvalidLength(what) => {
                write!(f, "invalid input length: {}", what)
            }
            Error::DecodeError(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
        }
    }
}

impl StdError for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DecodeError(desc))
}

/// Convenience function to create a metadata error.
pub fn metadata_error<T>(kind: MetadataErrorKind) -> Result<T> {
    Err(Error::Metadata(kind))
}

/// Convenience function to create an invalid length error.
pub fn invalid_length_error<T>(what: &'static str) -> Result<T> {
    Err(Error::InvalidLength(what))
}
