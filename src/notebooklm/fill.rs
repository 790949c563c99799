//! Painting sampled background over the watermark, masked or wholesale.

use image::Rgba;

use super::detect::BinaryMask;
use super::geometry::{round, DetectionRoi, FillRegion};
use super::mask::RejectReason;
use super::sampler::ColumnSamples;
use crate::codec::PixelBuffer;

/// Accepted masks must cover between 1% and 72% of the fill region.
const MASK_AREA_RATIO_MIN: f64 = 0.01;
const MASK_AREA_RATIO_MAX: f64 = 0.72;
/// Masked pixels with at least this many masked neighbours are fully replaced.
const INTERIOR_NEIGHBORS: usize = 5;
const EDGE_BLEND: f64 = 0.82;
/// Rows at the top of a full-region fill that ramp in gradually.
const SEAM_ROWS: u32 = 2;

/// Why the whole fill region was overwritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FullFillReason {
    /// Detection found no trustworthy glyph.
    Rejected(RejectReason),
    /// The mask covered too little or too much of the fill region.
    RatioOutOfRange(f64),
}

/// How the fill region was repainted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillStrategy {
    /// Only detected glyph pixels were replaced.
    Masked {
        /// Share of the fill region covered by the mask.
        ratio: f64,
    },
    /// The entire fill region was replaced.
    FullRegion(FullFillReason),
}

/// Whether a mask covering `ratio` of the fill region can be trusted.
#[must_use]
pub fn ratio_in_range(ratio: f64) -> bool {
    (MASK_AREA_RATIO_MIN..=MASK_AREA_RATIO_MAX).contains(&ratio)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(old: Rgba<u8>, fill: Rgba<u8>, t: f64) -> Rgba<u8> {
    Rgba(std::array::from_fn(|ch| {
        let v = f64::from(old[ch]) * (1.0 - t) + f64::from(fill[ch]) * t;
        round(v).clamp(0, 255) as u8
    }))
}

/// Replace masked pixels inside the fill region with the column background.
///
/// Glyph interiors are replaced outright; mask edges are blended softly so
/// no hard seam is left. All four channels are painted.
pub fn apply_masked_fill(
    buffer: &mut PixelBuffer,
    region: &FillRegion,
    roi: &DetectionRoi,
    mask: &BinaryMask,
    samples: &ColumnSamples,
) {
    for y in region.y1..region.y2 {
        for x in region.x1..region.x2 {
            let Some(idx) = roi.local_index(x, y) else {
                continue;
            };
            if !mask.is_set(idx) {
                continue;
            }

            let neighbors = mask.neighbor_count(x - roi.x1, y - roi.y1);
            let t = if neighbors >= INTERIOR_NEIGHBORS { 1.0 } else { EDGE_BLEND };
            let fill = samples.get((x - region.x1) as usize);
            let px = buffer.get_pixel_mut(x, y);
            *px = blend(*px, fill, t);
        }
    }
}

/// Overwrite the whole fill region with the column background.
///
/// The first rows ramp from the existing pixels to the background to hide
/// the seam with the untouched content above.
pub fn apply_full_region_fill(buffer: &mut PixelBuffer, region: &FillRegion, samples: &ColumnSamples) {
    for x in region.x1..region.x2 {
        let fill = samples.get((x - region.x1) as usize);
        for y in region.y1..region.y2 {
            let row = y - region.y1;
            let px = buffer.get_pixel_mut(x, y);
            if row < SEAM_ROWS {
                let t = f64::from(row + 1) / f64::from(SEAM_ROWS + 1);
                *px = blend(*px, fill, t);
            } else {
                *px = fill;
            }
        }
    }
}
