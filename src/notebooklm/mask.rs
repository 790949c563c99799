//! Component filtering, dilation and the accept/reject decision.

use super::detect::{build_diff_mask, build_gray_roi, collect_components, BinaryMask, ComponentStats};
use super::geometry::{round, DetectionRoi, FillRegion};
use crate::codec::PixelBuffer;

/// Components must cover at least this share of the ROI (and 20 pixels).
const MIN_COMPONENT_RATIO: f64 = 0.002;
const MIN_COMPONENT_AREA: i64 = 20;
/// Accepted components together must cover this share (and 64 pixels).
const MIN_TOTAL_RATIO: f64 = 0.006;
const MIN_TOTAL_AREA: i64 = 64;
/// Component centres must lie right of / below these fractions of the ROI.
const MIN_CENTER_X: f64 = 0.46;
const MIN_CENTER_Y: f64 = 0.36;
/// Components spanning more of the ROI than this are lighting, not glyphs.
const MAX_SPAN: f64 = 0.9;
/// Dilation passes applied to the selected glyph pixels.
const DILATE_ITERATIONS: usize = 2;

/// Why a detection was not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Accepted components did not add up to enough pixels.
    InsufficientArea {
        /// Pixels in accepted components.
        selected: usize,
        /// Minimum required.
        required: usize,
    },
    /// The dilated mask never touches the fill region.
    NoOverlap,
}

/// Outcome of glyph detection in the ROI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A trustworthy glyph mask, sized to the ROI.
    Accepted(BinaryMask),
    /// No trustworthy glyph was found.
    Rejected(RejectReason),
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn area_floor(roi_area: usize, ratio: f64, floor: i64) -> usize {
    round(roi_area as f64 * ratio).max(floor) as usize
}

/// Whether a component looks like part of the bottom-right watermark.
///
/// It must be large enough, centred in the bottom-right part of the ROI and
/// not span (nearly) the whole ROI.
#[must_use]
pub fn is_watermark_component(comp: &ComponentStats, roi_width: u32, roi_height: u32) -> bool {
    let roi_area = roi_width as usize * roi_height as usize;
    if comp.area() < area_floor(roi_area, MIN_COMPONENT_RATIO, MIN_COMPONENT_AREA) {
        return false;
    }

    let (w, h) = (f64::from(roi_width), f64::from(roi_height));
    let (cx, cy) = comp.center();
    if cx < w * MIN_CENTER_X || cy < h * MIN_CENTER_Y {
        return false;
    }

    f64::from(comp.width()) <= w * MAX_SPAN && f64::from(comp.height()) <= h * MAX_SPAN
}

/// Union the pixels of every component that passes [`is_watermark_component`].
#[must_use]
pub fn select_components(components: &[ComponentStats], width: u32, height: u32) -> BinaryMask {
    let mut selected = BinaryMask::new(width, height);
    for comp in components.iter().filter(|c| is_watermark_component(c, width, height)) {
        for &idx in &comp.pixels {
            selected.set(idx);
        }
    }
    selected
}

/// Grow `mask` by `iterations` passes of 3x3 binary dilation.
#[must_use]
pub fn dilate_mask(mask: &BinaryMask, iterations: usize) -> BinaryMask {
    let mut src = mask.clone();
    for _ in 0..iterations {
        let mut dst = BinaryMask::new(src.width(), src.height());
        for y in 0..src.height() {
            for x in 0..src.width() {
                if src.any_in_window(x, y) {
                    dst.set(src.index(x, y));
                }
            }
        }
        src = dst;
    }
    src
}

/// Number of set mask pixels that fall inside the fill region.
#[must_use]
pub fn count_mask_pixels_in_region(mask: &BinaryMask, roi: &DetectionRoi, region: &FillRegion) -> usize {
    let mut count = 0;
    for y in region.y1..region.y2 {
        for x in region.x1..region.x2 {
            if roi.local_index(x, y).is_some_and(|idx| mask.is_set(idx)) {
                count += 1;
            }
        }
    }
    count
}

/// Detect watermark glyph pixels in the ROI.
///
/// Returns a dilated, ROI-sized mask, or the reason detection was rejected.
#[must_use]
pub fn build_watermark_mask(buffer: &PixelBuffer, roi: &DetectionRoi, region: &FillRegion) -> Detection {
    let (width, height) = (roi.width(), roi.height());
    let gray = build_gray_roi(buffer, roi);
    let diff_mask = build_diff_mask(&gray, width, height);
    let components = collect_components(&diff_mask);

    let selected = select_components(&components, width, height);
    let selected_area = selected.count();
    let required = area_floor(roi.area(), MIN_TOTAL_RATIO, MIN_TOTAL_AREA);
    log::debug!(
        "{} components, {selected_area} selected pixels (need {required})",
        components.len()
    );

    if selected_area < required {
        return Detection::Rejected(RejectReason::InsufficientArea {
            selected: selected_area,
            required,
        });
    }

    let dilated = dilate_mask(&selected, DILATE_ITERATIONS);
    if count_mask_pixels_in_region(&dilated, roi, region) == 0 {
        return Detection::Rejected(RejectReason::NoOverlap);
    }

    Detection::Accepted(dilated)
}
