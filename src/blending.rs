//! Alpha blending math for the fixed-position Gemini watermark.
//!
//! Gemini applies its logo via forward alpha blending against white:
//! `watermarked = alpha * 255 + (1 - alpha) * original`
//!
//! This module provides the reverse operation to recover original pixels,
//! plus the forward composite used to synthesise watermarked fixtures.

use image::RgbaImage;

/// Alpha threshold: ignore pixels with negligible watermark effect (noise).
pub const ALPHA_THRESHOLD: f32 = 0.002;

/// Maximum alpha: clamp to avoid division by near-zero in reverse blending.
pub const MAX_ALPHA: f32 = 0.99;

/// Colour value of the logo (white).
const LOGO_VALUE: f32 = 255.0;

/// Visit every in-bounds pixel of the `size x size` square at `(pos_x, pos_y)`
/// whose clamped alpha is at least [`ALPHA_THRESHOLD`].
///
/// The square may hang off any edge of the image; those pixels are skipped.
fn for_each_blended_pixel(
    image: &mut RgbaImage,
    alpha_map: &[f32],
    size: u32,
    pos_x: i64,
    pos_y: i64,
    mut f: impl FnMut(&mut image::Rgba<u8>, f32),
) {
    let img_w = i64::from(image.width());
    let img_h = i64::from(image.height());
    let size = i64::from(size);

    for row in 0..size {
        let py = pos_y + row;
        if py < 0 || py >= img_h {
            continue;
        }

        for col in 0..size {
            let px = pos_x + col;
            if px < 0 || px >= img_w {
                continue;
            }

            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let Some(&raw) = alpha_map.get((row * size + col) as usize) else {
                continue;
            };
            let alpha = raw.min(MAX_ALPHA);
            if alpha < ALPHA_THRESHOLD {
                continue;
            }

            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let (x, y) = (px as u32, py as u32);
            f(image.get_pixel_mut(x, y), alpha);
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Remove the watermark from an image using reverse alpha blending.
///
/// Applies `original = (watermarked - alpha * 255) / (1 - alpha)` to the RGB
/// channels of every pixel in the square, rounding and clamping to `[0, 255]`.
/// The image's own alpha channel is left untouched.
///
/// # Arguments
///
/// * `image` - The watermarked image to modify in-place.
/// * `alpha_map` - Flat array of alpha values, length `size * size`.
/// * `size` - Edge length of the square watermark region.
/// * `pos_x` - X coordinate of the square's top-left corner (may be negative).
/// * `pos_y` - Y coordinate of the square's top-left corner (may be negative).
pub fn remove_watermark_alpha_blend(
    image: &mut RgbaImage,
    alpha_map: &[f32],
    size: u32,
    pos_x: i64,
    pos_y: i64,
) {
    for_each_blended_pixel(image, alpha_map, size, pos_x, pos_y, |px, alpha| {
        let inv_alpha = 1.0 - alpha;
        for ch in 0..3 {
            let watermarked = f32::from(px[ch]);
            px[ch] = to_channel((watermarked - alpha * LOGO_VALUE) / inv_alpha);
        }
    });
}

/// Apply the watermark with the forward composite
/// `alpha * 255 + (1 - alpha) * original`.
///
/// Uses the same square, bounds handling and thresholds as
/// [`remove_watermark_alpha_blend`], so the two are inverse up to rounding.
pub fn apply_watermark_alpha_blend(
    image: &mut RgbaImage,
    alpha_map: &[f32],
    size: u32,
    pos_x: i64,
    pos_y: i64,
) {
    for_each_blended_pixel(image, alpha_map, size, pos_x, pos_y, |px, alpha| {
        for ch in 0..3 {
            let original = f32::from(px[ch]);
            px[ch] = to_channel(alpha * LOGO_VALUE + (1.0 - alpha) * original);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn patterned(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                (x * 7 % 256) as u8,
                (y * 11 % 256) as u8,
                ((x + y) * 3 % 256) as u8,
                255,
            ])
        })
    }

    #[test]
    fn reverse_blend_recovers_original_within_tolerance() {
        let original = patterned(100, 100);
        let mut img = original.clone();

        let size = 10u32;
        #[allow(clippy::cast_precision_loss)]
        let alpha_map: Vec<f32> = (0..size * size)
            .map(|i| (i as f32) / (size * size) as f32 * 0.5)
            .collect();

        apply_watermark_alpha_blend(&mut img, &alpha_map, size, 50, 50);
        assert_ne!(img, original);
        remove_watermark_alpha_blend(&mut img, &alpha_map, size, 50, 50);

        for (restored, orig) in img.pixels().zip(original.pixels()) {
            for ch in 0..3 {
                let diff = (i32::from(restored[ch]) - i32::from(orig[ch])).abs();
                assert!(diff <= 1, "channel {ch} diff {diff}");
            }
        }
    }

    #[test]
    fn reverse_blend_leaves_alpha_channel_alone() {
        let mut img = RgbaImage::from_pixel(4, 4, image::Rgba([200, 200, 200, 77]));
        remove_watermark_alpha_blend(&mut img, &[0.4; 16], 4, 0, 0);
        for px in img.pixels() {
            assert_eq!(px[3], 77);
            assert_ne!(px[0], 200);
        }
    }

    #[test]
    fn negligible_alpha_is_skipped() {
        let mut img = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        let before = img.clone();
        remove_watermark_alpha_blend(&mut img, &[0.001; 16], 4, 0, 0);
        assert_eq!(img, before);
    }

    #[test]
    fn full_opacity_is_clamped_not_divided_by_zero() {
        let mut img = RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        remove_watermark_alpha_blend(&mut img, &[1.0; 4], 2, 0, 0);
        // (255 - 0.99 * 255) / 0.01 == 255
        for px in img.pixels() {
            assert_eq!(px[0], 255);
        }

        let mut dark = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        remove_watermark_alpha_blend(&mut dark, &[1.0; 4], 2, 0, 0);
        assert_eq!(dark.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn square_hanging_off_the_image_is_clipped() {
        let mut img = RgbaImage::from_pixel(8, 8, image::Rgba([255, 255, 255, 255]));
        // Only the bottom-right 4x4 of the 8x8 square lands on the image.
        remove_watermark_alpha_blend(&mut img, &[0.5; 64], 8, -4, -4);
        assert_eq!(img.get_pixel(0, 0)[0], 255);

        let mut img = patterned(8, 8);
        let before = img.clone();
        remove_watermark_alpha_blend(&mut img, &[0.5; 64], 8, 6, 6);
        assert_ne!(img.get_pixel(7, 7), before.get_pixel(7, 7));
        assert_eq!(img.get_pixel(5, 5), before.get_pixel(5, 5));
    }
}
