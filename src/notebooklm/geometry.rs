//! Fill region and detection ROI placement, scaled from the reference export.
//!
//! NotebookLM places its watermark relative to a 2752x1536 export. Every
//! other export size is handled by scaling the reference box and margins.

/// Width of the reference export the constants below were measured on.
const REFERENCE_WIDTH: f64 = 2752.0;
/// Height of the reference export.
const REFERENCE_HEIGHT: f64 = 1536.0;
/// Watermark box on the reference export.
const WATERMARK_WIDTH: f64 = 230.0;
const WATERMARK_HEIGHT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 10.0;
const MARGIN_BOTTOM: f64 = 10.0;
/// Sampling strip, measured upward from the box top edge.
const SAMPLE_TOP_START: f64 = 20.0;
const SAMPLE_TOP_END: f64 = 4.0;
const MIN_SCALE: f64 = 0.55;
const MAX_SCALE: f64 = 2.2;

/// Rectangle overwritten by the fill, plus the strip above it that is
/// sampled for background colour. All ranges are half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRegion {
    /// Left edge (inclusive).
    pub x1: u32,
    /// Top edge (inclusive).
    pub y1: u32,
    /// Right edge (exclusive).
    pub x2: u32,
    /// Bottom edge (exclusive).
    pub y2: u32,
    /// First row of the sampling strip.
    pub sample_y1: u32,
    /// Row after the last row of the sampling strip.
    pub sample_y2: u32,
}

impl FillRegion {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Whether `(x, y)` lies inside the region.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x1..self.x2).contains(&x) && (self.y1..self.y2).contains(&y)
    }
}

/// Padded search area for watermark glyphs. Half-open like [`FillRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionRoi {
    /// Left edge (inclusive).
    pub x1: u32,
    /// Top edge (inclusive).
    pub y1: u32,
    /// Right edge (exclusive).
    pub x2: u32,
    /// Bottom edge (exclusive).
    pub y2: u32,
}

impl DetectionRoi {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Index into an ROI-sized mask for image coordinates `(x, y)`, if inside.
    #[must_use]
    pub fn local_index(&self, x: u32, y: u32) -> Option<usize> {
        if (self.x1..self.x2).contains(&x) && (self.y1..self.y2).contains(&y) {
            Some((y - self.y1) as usize * self.width() as usize + (x - self.x1) as usize)
        } else {
            None
        }
    }
}

/// `min` is applied last, so a lower bound above the upper bound wins.
fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.min(max).max(min)
}

/// Round half up, matching the rounding the constants were tuned with.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn to_u32(value: i64) -> u32 {
    value.max(0) as u32
}

/// Scale factor from the reference export to a `width x height` image.
#[must_use]
pub fn scale_for(width: u32, height: u32) -> f64 {
    let scale = (f64::from(width) / REFERENCE_WIDTH).min(f64::from(height) / REFERENCE_HEIGHT);
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Place the fill box and its sampling strip on a `width x height` image.
///
/// The box is anchored to the bottom-right corner and always lies inside the
/// image. Both dimensions must be at least 1.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn resolve_fill_region(width: u32, height: u32) -> FillRegion {
    let scale = scale_for(width, height);
    let (w, h) = (i64::from(width), i64::from(height));

    let wm_width = clamp(round(WATERMARK_WIDTH * scale), 96, w - 2);
    let wm_height = clamp(round(WATERMARK_HEIGHT * scale), 28, h - 2);
    let margin_right = clamp(round(MARGIN_RIGHT * scale), 2, (w as f64 * 0.05).floor() as i64);
    let margin_bottom = clamp(round(MARGIN_BOTTOM * scale), 2, (h as f64 * 0.05).floor() as i64);

    let x2 = clamp(w - margin_right, 1, w);
    let y2 = clamp(h - margin_bottom, 1, h);
    let x1 = clamp(x2 - wm_width, 0, x2 - 1);
    let y1 = clamp(y2 - wm_height, 0, y2 - 1);

    let sample_top = round(SAMPLE_TOP_START * scale).max(2);
    let sample_bottom = round(SAMPLE_TOP_END * scale).max(1);
    let sample_y1 = clamp(y1 - sample_top, 0, y1);
    let sample_y2 = clamp(y1 - sample_bottom, sample_y1 + 1, y1 + 1);

    FillRegion {
        x1: to_u32(x1),
        y1: to_u32(y1),
        x2: to_u32(x2),
        y2: to_u32(y2),
        sample_y1: to_u32(sample_y1),
        sample_y2: to_u32(sample_y2),
    }
}

/// Pad the fill region into the area searched for glyphs.
///
/// Glyphs protrude up and to the left of the nominal box far more than down
/// or right, so the padding is lopsided.
#[must_use]
pub fn resolve_detection_roi(width: u32, height: u32, region: &FillRegion) -> DetectionRoi {
    let (w, h) = (i64::from(width), i64::from(height));
    let region_width = f64::from(region.width());
    let region_height = f64::from(region.height());

    let pad_left = clamp(round(region_width * 0.35), 14, 120);
    let pad_top = clamp(round(region_height * 0.9), 10, 72);
    let pad_right = clamp(round(region_width * 0.05), 2, 20);
    let pad_bottom = clamp(round(region_height * 0.08), 1, 8);

    let x1 = clamp(i64::from(region.x1) - pad_left, 0, w - 1);
    let y1 = clamp(i64::from(region.y1) - pad_top, 0, h - 1);
    let x2 = clamp(i64::from(region.x2) + pad_right, x1 + 1, w);
    let y2 = clamp(i64::from(region.y2) + pad_bottom, y1 + 1, h);

    DetectionRoi {
        x1: to_u32(x1),
        y1: to_u32(y1),
        x2: to_u32(x2),
        y2: to_u32(y2),
    }
}
