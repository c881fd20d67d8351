// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements byte-level readers and writers over in-memory buffers.
//!
//! The wire format mixes endianness deliberately: fixed header integers are
//! little-endian, while the metadata length words, SBR words, and CRC storage
//! are big-endian. The reader and writer expose both.

mod buf_reader;
mod buf_writer;

pub use buf_reader::BufReader;
pub use buf_writer::BufWriter;
