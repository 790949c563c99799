//! Local-contrast detection of watermark glyph pixels inside the ROI.
//!
//! 1. **Luminance**: integer BT.601-style weighting per pixel.
//! 2. **Difference signal**: `|pixel - median(3x3)|`, thresholded adaptively
//!    from the signal's own mean and standard deviation.
//! 3. **Components**: 8-connected labelling with an explicit stack.

use std::ops::RangeInclusive;

use super::geometry::{round, DetectionRoi};
use crate::codec::PixelBuffer;

/// Lower bound of the adaptive difference threshold.
const DIFF_MIN_THRESHOLD: i64 = 18;
/// Upper bound of the adaptive difference threshold.
const DIFF_MAX_THRESHOLD: i64 = 52;
/// Weight of the standard deviation in the adaptive threshold.
const STDDEV_FACTOR: f64 = 0.85;

/// A binary mask covering a rectangular area, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// An all-clear mask of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Mask width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major flags, one per pixel.
    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Whether the pixel at `(x, y)` is set.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    /// Whether the pixel at flat index `idx` is set.
    #[must_use]
    pub fn is_set(&self, idx: usize) -> bool {
        self.bits[idx]
    }

    /// Set the pixel at flat index `idx`. Returns `true` if it was clear.
    pub fn set(&mut self, idx: usize) -> bool {
        !std::mem::replace(&mut self.bits[idx], true)
    }

    /// Number of set pixels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Flat index of `(x, y)`.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Clamped 3x3 window around `(x, y)`, as inclusive ranges.
    fn window(&self, x: u32, y: u32) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        (
            x.saturating_sub(1)..=(x + 1).min(self.width - 1),
            y.saturating_sub(1)..=(y + 1).min(self.height - 1),
        )
    }

    /// Number of set pixels among the (up to 8) neighbours of `(x, y)`.
    #[must_use]
    pub fn neighbor_count(&self, x: u32, y: u32) -> usize {
        let (xs, ys) = self.window(x, y);
        ys.flat_map(|ny| xs.clone().map(move |nx| (nx, ny)))
            .filter(|&(nx, ny)| (nx, ny) != (x, y) && self.get(nx, ny))
            .count()
    }

    /// Whether `(x, y)` or any of its neighbours is set.
    #[must_use]
    pub fn any_in_window(&self, x: u32, y: u32) -> bool {
        let (xs, mut ys) = self.window(x, y);
        ys.any(|ny| xs.clone().any(|nx| self.get(nx, ny)))
    }
}

/// One 8-connected blob of a [`BinaryMask`], in mask coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStats {
    /// Leftmost column.
    pub x1: u32,
    /// Topmost row.
    pub y1: u32,
    /// Rightmost column (inclusive).
    pub x2: u32,
    /// Bottom row (inclusive).
    pub y2: u32,
    /// Flat mask indices of the member pixels.
    pub pixels: Vec<usize>,
}

impl ComponentStats {
    /// Number of member pixels.
    #[must_use]
    pub fn area(&self) -> usize {
        self.pixels.len()
    }

    /// Bounding box width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1 + 1
    }

    /// Bounding box height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1 + 1
    }

    /// Centre of the bounding box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x1) + f64::from(self.width()) / 2.0,
            f64::from(self.y1) + f64::from(self.height()) / 2.0,
        )
    }
}

/// Luminance `(R*77 + G*150 + B*29) >> 8` for every pixel of the ROI.
#[must_use]
pub fn build_gray_roi(buffer: &PixelBuffer, roi: &DetectionRoi) -> Vec<u8> {
    let mut gray = Vec::with_capacity(roi.area());
    for y in roi.y1..roi.y2 {
        for x in roi.x1..roi.x2 {
            let px = buffer.get_pixel(x, y);
            let lum = (u32::from(px[0]) * 77 + u32::from(px[1]) * 150 + u32::from(px[2]) * 29) >> 8;
            gray.push(u8::try_from(lum).unwrap_or(u8::MAX));
        }
    }
    gray
}

/// Absolute difference between each pixel and its 3x3 median.
///
/// Edge pixels reuse the nearest row/column instead of wrapping.
#[must_use]
pub fn median_difference(gray: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut diff = Vec::with_capacity(gray.len());
    let mut neighborhood = [0u8; 9];

    for y in 0..h {
        let rows = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        for x in 0..w {
            let cols = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            for (i, &ny) in rows.iter().enumerate() {
                for (j, &nx) in cols.iter().enumerate() {
                    neighborhood[i * 3 + j] = gray[ny * w + nx];
                }
            }
            neighborhood.sort_unstable();
            diff.push(gray[y * w + x].abs_diff(neighborhood[4]));
        }
    }

    diff
}

/// `clamp(round(mean + 0.85 * stddev), 18, 52)` over the difference signal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn adaptive_threshold(diff: &[u8]) -> u8 {
    if diff.is_empty() {
        return 0;
    }
    let n = diff.len() as f64;
    let mean = diff.iter().map(|&d| f64::from(d)).sum::<f64>() / n;
    let variance = diff
        .iter()
        .map(|&d| (f64::from(d) - mean).powi(2))
        .sum::<f64>()
        / n;

    let threshold = round(mean + variance.sqrt() * STDDEV_FACTOR)
        .clamp(DIFF_MIN_THRESHOLD, DIFF_MAX_THRESHOLD);
    u8::try_from(threshold).unwrap_or(u8::MAX)
}

/// Binarise the local-contrast signal of a grayscale ROI.
///
/// A pixel is foreground iff its difference from the 3x3 median reaches the
/// adaptive threshold.
#[must_use]
pub fn build_diff_mask(gray: &[u8], width: u32, height: u32) -> BinaryMask {
    let diff = median_difference(gray, width, height);
    let threshold = adaptive_threshold(&diff);
    log::debug!("difference threshold {threshold} over {width}x{height} ROI");

    BinaryMask {
        width,
        height,
        bits: diff.iter().map(|&d| d >= threshold).collect(),
    }
}

/// Label the 8-connected components of `mask`.
///
/// Components are returned in order of their first pixel in row-major scan.
#[must_use]
pub fn collect_components(mask: &BinaryMask) -> Vec<ComponentStats> {
    let width = mask.width() as usize;
    let mut visited = vec![false; mask.bits().len()];
    let mut stack = Vec::new();
    let mut components = Vec::new();

    for start in 0..mask.bits().len() {
        if !mask.is_set(start) || visited[start] {
            continue;
        }

        let mut comp = ComponentStats {
            x1: mask.width(),
            y1: mask.height(),
            x2: 0,
            y2: 0,
            pixels: Vec::new(),
        };
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            comp.pixels.push(idx);
            #[allow(clippy::cast_possible_truncation)]
            let (x, y) = ((idx % width) as u32, (idx / width) as u32);
            comp.x1 = comp.x1.min(x);
            comp.y1 = comp.y1.min(y);
            comp.x2 = comp.x2.max(x);
            comp.y2 = comp.y2.max(y);

            let (xs, ys) = mask.window(x, y);
            for ny in ys {
                for nx in xs.clone() {
                    let neighbor = mask.index(nx, ny);
                    if mask.is_set(neighbor) && !visited[neighbor] {
                        visited[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }
        }

        components.push(comp);
    }

    components
}
