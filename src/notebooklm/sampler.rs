//! Per-column background colour estimated from the strip above the fill box.

use image::Rgba;

use super::geometry::{round, FillRegion};
use crate::codec::PixelBuffer;

/// Source pixels more transparent than this are left out of the average.
const MIN_SAMPLE_ALPHA: u8 = 8;

/// One background colour per column of a [`FillRegion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSamples {
    colors: Vec<Rgba<u8>>,
}

impl ColumnSamples {
    /// Background colour for column `col`, counted from the region's left edge.
    ///
    /// # Panics
    ///
    /// Panics if `col` is not a column of the sampled region.
    #[must_use]
    pub fn get(&self, col: usize) -> Rgba<u8> {
        self.colors[col]
    }

    /// Number of sampled columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether no columns were sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mean(sum: u32, count: u32) -> u8 {
    round(f64::from(sum) / f64::from(count)).clamp(0, 255) as u8
}

/// Average each column of the sampling strip into a background colour.
///
/// Columns whose strip is entirely (near-)transparent fall back to the pixel
/// just above the fill box.
#[must_use]
pub fn build_column_samples(buffer: &PixelBuffer, region: &FillRegion) -> ColumnSamples {
    let colors = (region.x1..region.x2)
        .map(|x| {
            let mut sum = [0u32; 4];
            let mut count = 0u32;

            for y in region.sample_y1..region.sample_y2 {
                let px = buffer.get_pixel(x, y);
                if px[3] < MIN_SAMPLE_ALPHA {
                    continue;
                }
                for (acc, &v) in sum.iter_mut().zip(px.0.iter()) {
                    *acc += u32::from(v);
                }
                count += 1;
            }

            if count > 0 {
                Rgba(sum.map(|s| mean(s, count)))
            } else {
                *buffer.get_pixel(x, region.y1.saturating_sub(1))
            }
        })
        .collect();

    ColumnSamples { colors }
}
