//! Fixed-position Gemini watermark: size selection, placement and removal.

use crate::alpha_map::AlphaMapCache;
use crate::blending;
use crate::codec::PixelBuffer;
use crate::error::Result;

/// Watermark size classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatermarkSize {
    /// 48x48 watermark, 32px margin (images where either dimension <= 1024).
    Small,
    /// 96x96 watermark, 64px margin (images where both dimensions > 1024).
    Large,
}

impl WatermarkSize {
    /// Edge length of the square watermark in pixels.
    #[must_use]
    pub fn edge(self) -> u32 {
        match self {
            Self::Small => 48,
            Self::Large => 96,
        }
    }

    /// Right and bottom margin between the watermark and the image edge.
    #[must_use]
    pub fn margin(self) -> u32 {
        match self {
            Self::Small => 32,
            Self::Large => 64,
        }
    }

    /// File name of the reference capture for this size.
    #[must_use]
    pub fn reference_file_name(self) -> &'static str {
        match self {
            Self::Small => "bg_48.png",
            Self::Large => "bg_96.png",
        }
    }
}

/// Size and margins of the watermark for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkConfig {
    /// Watermark size tier.
    pub size: WatermarkSize,
    /// Gap between the watermark and the right edge.
    pub margin_right: u32,
    /// Gap between the watermark and the bottom edge.
    pub margin_bottom: u32,
}

/// Top-left corner and edge length of the watermark square.
///
/// Coordinates are signed: on images smaller than the watermark plus its
/// margin the square starts above or left of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkPosition {
    /// X coordinate of the top-left corner.
    pub x: i64,
    /// Y coordinate of the top-left corner.
    pub y: i64,
    /// Edge length in pixels.
    pub size: u32,
}

/// Pick the watermark tier for an image.
///
/// - **Large** (96x96, 64px margins): both width AND height > 1024
/// - **Small** (48x48, 32px margins): otherwise (including 1024x1024)
#[must_use]
pub fn detect_config(width: u32, height: u32) -> WatermarkConfig {
    let size = if width > 1024 && height > 1024 {
        WatermarkSize::Large
    } else {
        WatermarkSize::Small
    };
    WatermarkConfig {
        size,
        margin_right: size.margin(),
        margin_bottom: size.margin(),
    }
}

/// Anchor the watermark square to the bottom-right corner.
#[must_use]
pub fn compute_position(width: u32, height: u32, config: &WatermarkConfig) -> WatermarkPosition {
    let edge = config.size.edge();
    WatermarkPosition {
        x: i64::from(width) - i64::from(config.margin_right) - i64::from(edge),
        y: i64::from(height) - i64::from(config.margin_bottom) - i64::from(edge),
        size: edge,
    }
}

/// Remove the Gemini watermark from `buffer` in place.
///
/// Returns where the watermark was assumed to be.
///
/// # Errors
///
/// Returns an error if the alpha map for the selected size cannot be built.
pub fn remove_gemini_watermark(
    buffer: &mut PixelBuffer,
    alpha_maps: &AlphaMapCache,
) -> Result<WatermarkPosition> {
    let (width, height) = buffer.dimensions();
    let config = detect_config(width, height);
    let position = compute_position(width, height, &config);
    let alpha_map = alpha_maps.get(config.size)?;

    log::debug!(
        "unblending {0}x{0} watermark at ({1}, {2}) on {width}x{height} image",
        position.size,
        position.x,
        position.y
    );
    blending::remove_watermark_alpha_blend(
        buffer,
        alpha_map.values(),
        position.size,
        position.x,
        position.y,
    );

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha_map::tests::synthetic_source;

    #[test]
    fn watermark_size_small_when_either_dim_lte_1024() {
        assert_eq!(detect_config(800, 600).size, WatermarkSize::Small);
        assert_eq!(detect_config(1024, 1024).size, WatermarkSize::Small);
        assert_eq!(detect_config(2048, 512).size, WatermarkSize::Small);
        assert_eq!(detect_config(512, 2048).size, WatermarkSize::Small);
    }

    #[test]
    fn watermark_size_large_when_both_dims_gt_1024() {
        assert_eq!(detect_config(1025, 1025).size, WatermarkSize::Large);
        assert_eq!(detect_config(2048, 2048).size, WatermarkSize::Large);
    }

    #[test]
    fn large_config_and_position() {
        let config = detect_config(2000, 1200);
        assert_eq!(config.size.edge(), 96);
        assert_eq!((config.margin_right, config.margin_bottom), (64, 64));
        let pos = compute_position(2000, 1200, &config);
        assert_eq!((pos.x, pos.y, pos.size), (1840, 1040, 96));
    }

    #[test]
    fn small_config_and_position() {
        let config = detect_config(500, 500);
        assert_eq!(config.size.edge(), 48);
        assert_eq!((config.margin_right, config.margin_bottom), (32, 32));
        let pos = compute_position(500, 500, &config);
        assert_eq!((pos.x, pos.y, pos.size), (420, 420, 48));
    }

    #[test]
    fn position_goes_negative_on_tiny_images() {
        let config = detect_config(40, 60);
        let pos = compute_position(40, 60, &config);
        assert_eq!((pos.x, pos.y), (-40, -20));
    }

    #[test]
    fn removal_only_touches_the_watermark_square() {
        let cache = AlphaMapCache::new(synthetic_source());
        let mut img = PixelBuffer::from_pixel(300, 200, image::Rgba([240, 240, 240, 255]));
        let before = img.clone();

        let pos = remove_gemini_watermark(&mut img, &cache).unwrap();
        assert_eq!((pos.x, pos.y), (220, 120));

        for (x, y, px) in img.enumerate_pixels() {
            let inside = (220..268).contains(&x) && (120..168).contains(&y);
            if !inside {
                assert_eq!(px, before.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
        assert!(cache.is_cached(WatermarkSize::Small));
        assert!(!cache.is_cached(WatermarkSize::Large));
    }

    #[test]
    fn tiny_image_is_clamped_not_an_error() {
        let cache = AlphaMapCache::new(synthetic_source());
        let mut img = PixelBuffer::from_pixel(10, 10, image::Rgba([200, 200, 200, 255]));
        assert!(remove_gemini_watermark(&mut img, &cache).is_ok());
    }
}
