//! Adaptive detect-and-fill removal of the NotebookLM export watermark.
//!
//! NotebookLM stamps a text/logo block near the bottom-right corner whose
//! exact footprint varies. Removal runs in three steps:
//!
//! 1. Detect likely glyph pixels in a padded ROI with a local-difference mask.
//! 2. If the mask is trustworthy, replace only masked pixels using per-column
//!    background samples taken just above the watermark.
//! 3. Otherwise overwrite the whole nominal watermark box with those samples.

pub mod detect;
pub mod fill;
pub mod geometry;
pub mod mask;
pub mod sampler;

use crate::codec::PixelBuffer;

pub use detect::{BinaryMask, ComponentStats};
pub use fill::{FillStrategy, FullFillReason};
pub use geometry::{DetectionRoi, FillRegion};
pub use mask::{Detection, RejectReason};
pub use sampler::ColumnSamples;

/// Remove the NotebookLM watermark from `buffer` in place.
///
/// Never fails: low-confidence detection falls back to a full-region fill.
/// Returns the strategy that was applied, or `None` for an empty image.
pub fn remove_notebooklm_watermark(buffer: &mut PixelBuffer) -> Option<FillStrategy> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let region = geometry::resolve_fill_region(width, height);
    let samples = sampler::build_column_samples(buffer, &region);
    let roi = geometry::resolve_detection_roi(width, height, &region);

    let strategy = match mask::build_watermark_mask(buffer, &roi, &region) {
        Detection::Accepted(glyphs) => {
            let masked = mask::count_mask_pixels_in_region(&glyphs, &roi, &region);
            #[allow(clippy::cast_precision_loss)]
            let ratio = masked as f64 / region.area().max(1) as f64;

            if fill::ratio_in_range(ratio) {
                fill::apply_masked_fill(buffer, &region, &roi, &glyphs, &samples);
                FillStrategy::Masked { ratio }
            } else {
                log::warn!("mask covers {:.1}% of the watermark box, filling it whole", ratio * 100.0);
                fill::apply_full_region_fill(buffer, &region, &samples);
                FillStrategy::FullRegion(FullFillReason::RatioOutOfRange(ratio))
            }
        }
        Detection::Rejected(reason) => {
            log::debug!("detection rejected ({reason:?}), filling the watermark box");
            fill::apply_full_region_fill(buffer, &region, &samples);
            FillStrategy::FullRegion(FullFillReason::Rejected(reason))
        }
    };

    log::debug!("{width}x{height} fill region {region:?}: {strategy:?}");
    Some(strategy)
}
