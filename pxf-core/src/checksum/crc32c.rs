// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::Lazy;

/// The reflected Castagnoli polynomial.
const POLY: u32 = 0x82F6_3B78;

static CRC32C_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];

    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
        *entry = crc;
    }

    table
});

/// CRC32-C (Castagnoli) error-detecting code.
#[derive(Clone)]
pub struct Crc32c {
    crc: u32,
}

impl Default for Crc32c {
    fn default() -> Self {
        Crc32c::new()
    }
}

impl Crc32c {
    pub fn new() -> Crc32c {
        Crc32c { crc: 0xFFFF_FFFF }
    }

    pub fn process_byte(&mut self, byte: u8) {
        self.crc = (self.crc >> 8) ^ CRC32C_TABLE[((self.crc ^ u32::from(byte)) & 0xFF) as usize];
    }

    pub fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }

    pub fn crc(&self) -> u32 {
        self.crc ^ 0xFFFF_FFFF
    }

    /// Computes the CRC32-C of a complete buffer in one call.
    pub fn of(buf: &[u8]) -> u32 {
        let mut crc = Crc32c::new();
        crc.process_buf_bytes(buf);
        crc.crc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_crc32c() {
        // Check value from the iSCSI CRC32-C test vectors.
        assert_eq!(Crc32c::of(b"123456789"), 0xE306_9283);
        assert_eq!(Crc32c::of(&[]), 0);
        assert_eq!(Crc32c::of(&[0u8; 32]), 0x8A91_36AA);
    }

    #[test]
    fn verify_streaming_matches_oneshot() {
        let data: Vec<u8> = (0u16..1024).map(|i| (i * 7 + 3) as u8).collect();
        let mut crc = Crc32c::new();
        for chunk in data.chunks(13) {
            crc.process_buf_bytes(chunk);
        }
        assert_eq!(crc.crc(), Crc32c::of(&data));
    }
}
