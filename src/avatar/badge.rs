//! Badge rendering: draws the queue count on top of the base avatar

use crate::error::QueueError;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Produces encoded avatar bytes showing a badge value
pub trait BadgeRenderer: Send + Sync {
    fn render(&self, level: u8) -> Result<Vec<u8>, QueueError>;
}

/// Semi-transparent magenta used for the count
const BADGE_COLOR: Rgba<u8> = Rgba([255, 0, 186, 128]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// 5x7 digit bitmaps, one row per byte, most significant of the low 5 bits
/// is the leftmost pixel
const DIGITS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

/// Renders PNG avatars from an in-memory base image
pub struct PngBadgeRenderer {
    base: RgbaImage,
}

impl PngBadgeRenderer {
    pub fn new(base: RgbaImage) -> Self {
        Self { base }
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let base = image::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open base avatar {}: {}", path.display(), e))?
            .to_rgba8();
        Ok(Self::new(base))
    }

    /// Composite the digits of `level` onto a copy of the base image
    pub fn compose(&self, level: u8) -> RgbaImage {
        let mut canvas = self.base.clone();
        // Plain avatar when nobody is queued
        if level == 0 {
            return canvas;
        }

        let digits: Vec<usize> = level
            .to_string()
            .bytes()
            .map(|b| usize::from(b - b'0'))
            .collect();
        let count = digits.len() as u32;
        let (width, height) = canvas.dimensions();

        // Aim for three quarters of the image height, shrink to fit the width
        let text_columns = count * GLYPH_WIDTH + (count - 1);
        let scale = ((height * 3 / 4) / GLYPH_HEIGHT)
            .min((width * 9 / 10) / text_columns)
            .max(1);

        let text_width = text_columns * scale;
        let text_height = GLYPH_HEIGHT * scale;
        let origin_x = width.saturating_sub(text_width) / 2;
        let origin_y = height.saturating_sub(text_height) / 2;

        for (index, digit) in digits.iter().enumerate() {
            let glyph_x = origin_x + index as u32 * (GLYPH_WIDTH + 1) * scale;
            draw_glyph(&mut canvas, &DIGITS[*digit], glyph_x, origin_y, scale);
        }
        canvas
    }
}

impl BadgeRenderer for PngBadgeRenderer {
    fn render(&self, level: u8) -> Result<Vec<u8>, QueueError> {
        let canvas = self.compose(level);
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| QueueError::Internal {
                message: format!("failed to encode avatar: {}", e),
            })?;
        Ok(bytes.into_inner())
    }
}

fn draw_glyph(canvas: &mut RgbaImage, rows: &[u8; 7], x: u32, y: u32, scale: u32) {
    let (width, height) = canvas.dimensions();
    for (row, bits) in rows.iter().enumerate() {
        for column in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                continue;
            }
            let left = x + column * scale;
            let top = y + row as u32 * scale;
            for py in top..(top + scale).min(height) {
                for px in left..(left + scale).min(width) {
                    let blended = blend(*canvas.get_pixel(px, py), BADGE_COLOR);
                    canvas.put_pixel(px, py, blended);
                }
            }
        }
    }
}

/// Source-over alpha compositing of `src` onto `dst`
fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_a = f32::from(src[3]) / 255.0;
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let value = (f32::from(src[i]) * src_a + f32::from(dst[i]) * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round() as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_base() -> RgbaImage {
        RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_zero_level_is_plain_avatar() {
        let renderer = PngBadgeRenderer::new(white_base());
        assert_eq!(renderer.compose(0), white_base());
    }

    #[test]
    fn test_nonzero_level_draws_centered_badge() {
        let renderer = PngBadgeRenderer::new(white_base());
        let canvas = renderer.compose(8);
        assert_ne!(canvas, white_base());

        // The middle bar of an 8 crosses the image centre
        let centre = canvas.get_pixel(32, 32);
        assert_ne!(*centre, Rgba([255, 255, 255, 255]));
        // Corners stay untouched
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_two_digit_level_fits_inside_image() {
        let renderer = PngBadgeRenderer::new(RgbaImage::from_pixel(
            32,
            32,
            Rgba([0, 0, 0, 255]),
        ));
        let canvas = renderer.compose(10);
        assert_eq!(canvas.dimensions(), (32, 32));
        assert!(canvas.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn test_render_produces_png() {
        let renderer = PngBadgeRenderer::new(white_base());
        let bytes = renderer.render(3).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, renderer.compose(3));
    }

    #[test]
    fn test_blend_over_transparent_keeps_source() {
        let out = blend(Rgba([0, 0, 0, 0]), BADGE_COLOR);
        assert_eq!(out, Rgba([255, 0, 186, 128]));
    }
}
