// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `text` module renders the informational status line of the text row.
//!
//! Glyphs are 3x5 bitmaps drawn foreground-only in white, with one pixel of
//! spacing. The row is informational; only the checksum blocks at its tail
//! are load-bearing, so rendering always stops 32 pixels short of the right
//! edge.

use crate::common::BLOCK_DIM;
use crate::image::PxfImage;

/// A glyph is 15 bits: five rows of three columns, top row in the most
/// significant bits, leftmost column in each row's most significant bit.
type Glyph = u16;

const fn glyph(rows: [u8; 5]) -> Glyph {
    ((rows[0] as u16) << 12)
        | ((rows[1] as u16) << 9)
        | ((rows[2] as u16) << 6)
        | ((rows[3] as u16) << 3)
        | rows[4] as u16
}

const GLYPH_FALLBACK: Glyph = glyph([0b111, 0b001, 0b010, 0b000, 0b010]);

fn lookup(ch: char) -> Option<Glyph> {
    let g = match ch {
        ' ' => glyph([0, 0, 0, 0, 0]),
        '0' => glyph([0b111, 0b101, 0b101, 0b101, 0b111]),
        '1' => glyph([0b010, 0b110, 0b010, 0b010, 0b111]),
        '2' => glyph([0b111, 0b001, 0b111, 0b100, 0b111]),
        '3' => glyph([0b111, 0b001, 0b111, 0b001, 0b111]),
        '4' => glyph([0b101, 0b101, 0b111, 0b001, 0b001]),
        '5' => glyph([0b111, 0b100, 0b111, 0b001, 0b111]),
        '6' => glyph([0b111, 0b100, 0b111, 0b101, 0b111]),
        '7' => glyph([0b111, 0b001, 0b001, 0b010, 0b010]),
        '8' => glyph([0b111, 0b101, 0b111, 0b101, 0b111]),
        '9' => glyph([0b111, 0b101, 0b111, 0b001, 0b111]),
        'A' => glyph([0b010, 0b101, 0b111, 0b101, 0b101]),
        'B' => glyph([0b110, 0b101, 0b110, 0b101, 0b110]),
        'C' => glyph([0b011, 0b100, 0b100, 0b100, 0b011]),
        'D' => glyph([0b110, 0b101, 0b101, 0b101, 0b110]),
        'E' => glyph([0b111, 0b100, 0b110, 0b100, 0b111]),
        'F' => glyph([0b111, 0b100, 0b110, 0b100, 0b100]),
        'G' => glyph([0b011, 0b100, 0b101, 0b101, 0b011]),
        'H' => glyph([0b101, 0b101, 0b111, 0b101, 0b101]),
        'I' => glyph([0b111, 0b010, 0b010, 0b010, 0b111]),
        'J' => glyph([0b001, 0b001, 0b001, 0b101, 0b010]),
        'K' => glyph([0b101, 0b110, 0b100, 0b110, 0b101]),
        'L' => glyph([0b100, 0b100, 0b100, 0b100, 0b111]),
        'M' => glyph([0b101, 0b111, 0b111, 0b101, 0b101]),
        'N' => glyph([0b111, 0b101, 0b101, 0b101, 0b101]),
        'O' => glyph([0b010, 0b101, 0b101, 0b101, 0b010]),
        'P' => glyph([0b110, 0b101, 0b110, 0b100, 0b100]),
        'Q' => glyph([0b010, 0b101, 0b101, 0b110, 0b011]),
        'R' => glyph([0b110, 0b101, 0b110, 0b110, 0b101]),
        'S' => glyph([0b011, 0b100, 0b010, 0b001, 0b110]),
        'T' => glyph([0b111, 0b010, 0b010, 0b010, 0b010]),
        'U' => glyph([0b101, 0b101, 0b101, 0b101, 0b111]),
        'V' => glyph([0b101, 0b101, 0b101, 0b101, 0b010]),
        'W' => glyph([0b101, 0b101, 0b111, 0b111, 0b101]),
        'X' => glyph([0b101, 0b101, 0b010, 0b101, 0b101]),
        'Y' => glyph([0b101, 0b101, 0b010, 0b010, 0b010]),
        'Z' => glyph([0b111, 0b001, 0b010, 0b100, 0b111]),
        '?' => GLYPH_FALLBACK,
        '/' => glyph([0b001, 0b001, 0b010, 0b100, 0b100]),
        ':' => glyph([0b000, 0b010, 0b000, 0b010, 0b000]),
        '.' => glyph([0b000, 0b000, 0b000, 0b000, 0b010]),
        '-' => glyph([0b000, 0b000, 0b111, 0b000, 0b000]),
        '_' => glyph([0b000, 0b000, 0b000, 0b000, 0b111]),
        _ => return None,
    };
    Some(g)
}

/// Maps an arbitrary character onto the glyph set: ASCII is uppercased,
/// everything unmappable renders as '?'.
fn transliterate(ch: char) -> Glyph {
    let upper = ch.to_ascii_uppercase();
    lookup(upper).unwrap_or(GLYPH_FALLBACK)
}

/// Draws the status line into the given block-row. Only foreground pixels
/// are written; drawing stops before the reserved checksum blocks.
pub fn draw_status_line(image: &mut PxfImage, block_row: usize, line: &str) {
    let base_y = block_row * BLOCK_DIM + 2;
    let limit = image.width as usize - 32;

    let mut x = 4usize;
    for ch in line.chars() {
        if x + 3 > limit {
            break;
        }
        let glyph = transliterate(ch);
        for row in 0..5 {
            for col in 0..3 {
                if glyph >> (14 - row * 3 - col) & 1 != 0 {
                    image.put_pixel(x + col, base_y + row, [255, 255, 255]);
                }
            }
        }
        x += 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::pixel_rgb;

    #[test]
    fn verify_drawing_stays_clear_of_checksum_blocks() {
        let mut image = PxfImage::new(24, "t.png".into());
        let long_line = "W".repeat(400);
        draw_status_line(&mut image, 1, &long_line);

        for y in 8..16 {
            for x in (1024 - 32)..1024 {
                assert_eq!(pixel_rgb(&image.data, 1024, x, y), [0, 0, 0]);
            }
        }
    }

    #[test]
    fn verify_foreground_only() {
        let mut image = PxfImage::new(24, "t.png".into());
        // Pre-fill a background pixel inside the first glyph cell; a glyph
        // must not overwrite background positions.
        image.put_pixel(4, 10, [9, 9, 9]);
        draw_status_line(&mut image, 1, ":");
        assert_eq!(pixel_rgb(&image.data, 1024, 4, 10), [9, 9, 9]);
    }

    #[test]
    fn verify_unmappable_falls_back() {
        // Should not panic, and should draw something.
        let mut image = PxfImage::new(24, "t.png".into());
        draw_status_line(&mut image, 1, "日本語");
        let lit = (0..1024)
            .flat_map(|x| (8..16).map(move |y| (x, y)))
            .filter(|&(x, y)| pixel_rgb(&image.data, 1024, x, y) == [255, 255, 255])
            .count();
        assert!(lit > 0);
    }
}
