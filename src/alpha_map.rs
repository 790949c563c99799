//! Per-pixel watermark opacity derived from reference captures.
//!
//! The reference images (`bg_48.png` / `bg_96.png`) are the Gemini logo
//! rendered on pure black, so each pixel's brightness is proportional to the
//! logo's opacity there: `alpha = max(R, G, B) / 255`.
//!
//! Alpha maps are built lazily by an [`AlphaMapCache`] owned by the caller,
//! once per [`WatermarkSize`], and shared read-only afterwards.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::gemini::WatermarkSize;

/// Opacity of the watermark at each pixel of a square reference patch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    size: u32,
    values: Vec<f32>,
}

impl AlphaMap {
    /// Build an alpha map from a reference capture taken on black.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceSize`] if the capture is not `size x size`.
    pub fn from_reference(reference: &RgbaImage, size: WatermarkSize) -> Result<Self> {
        let edge = size.edge();
        if reference.width() != edge || reference.height() != edge {
            return Err(Error::ReferenceSize {
                size: edge,
                width: reference.width(),
                height: reference.height(),
            });
        }

        Ok(Self {
            size: edge,
            values: calculate_alpha_map(reference),
        })
    }

    /// Decode an encoded reference capture and build its alpha map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlphaMapDecode`] if the bytes cannot be decoded, or
    /// [`Error::ReferenceSize`] if the capture has the wrong dimensions.
    pub fn decode(bytes: &[u8], size: WatermarkSize) -> Result<Self> {
        let reference = image::load_from_memory(bytes)
            .map_err(|source| Error::AlphaMapDecode {
                size: size.edge(),
                source,
            })?
            .to_rgba8();
        Self::from_reference(&reference, size)
    }

    /// Edge length of the square patch.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row-major alpha values, `size * size` entries in `[0, 1]`.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Compute `max(R, G, B) / 255` for every pixel of a reference capture.
#[must_use]
pub fn calculate_alpha_map(reference: &RgbaImage) -> Vec<f32> {
    reference
        .pixels()
        .map(|px| f32::from(px[0].max(px[1]).max(px[2])) / 255.0)
        .collect()
}

/// Supplies the encoded bytes of a reference capture.
pub trait ReferenceSource {
    /// Load the encoded reference image for `size`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceLoad`] if the bytes are unavailable.
    fn load(&self, size: WatermarkSize) -> Result<Vec<u8>>;
}

/// Reads `bg_48.png` and `bg_96.png` from a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Look for reference captures in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the captures are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReferenceSource for DirectorySource {
    fn load(&self, size: WatermarkSize) -> Result<Vec<u8>> {
        let path = self.dir.join(size.reference_file_name());
        log::debug!("loading reference capture {}", path.display());
        std::fs::read(&path).map_err(|source| Error::ReferenceLoad {
            size: size.edge(),
            source,
        })
    }
}

/// Reference captures already held in memory, e.g. via `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    small: Option<Vec<u8>>,
    large: Option<Vec<u8>>,
}

impl InMemorySource {
    /// Hold the encoded 48x48 and 96x96 captures.
    pub fn new(small: impl Into<Vec<u8>>, large: impl Into<Vec<u8>>) -> Self {
        Self {
            small: Some(small.into()),
            large: Some(large.into()),
        }
    }

    /// Set the capture for a single size.
    #[must_use]
    pub fn with(mut self, size: WatermarkSize, bytes: impl Into<Vec<u8>>) -> Self {
        match size {
            WatermarkSize::Small => self.small = Some(bytes.into()),
            WatermarkSize::Large => self.large = Some(bytes.into()),
        }
        self
    }
}

impl ReferenceSource for InMemorySource {
    fn load(&self, size: WatermarkSize) -> Result<Vec<u8>> {
        let bytes = match size {
            WatermarkSize::Small => self.small.as_ref(),
            WatermarkSize::Large => self.large.as_ref(),
        };
        bytes.cloned().ok_or_else(|| Error::ReferenceLoad {
            size: size.edge(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory {}", size.reference_file_name()),
            ),
        })
    }
}

/// Lazily built, write-once alpha maps for both watermark sizes.
///
/// The first request for a size loads and decodes its reference capture;
/// later requests return the stored map. Concurrent first requests may both
/// decode, but only the first result is kept and every caller gets it.
pub struct AlphaMapCache {
    source: Box<dyn ReferenceSource + Send + Sync>,
    small: Mutex<Option<Arc<AlphaMap>>>,
    large: Mutex<Option<Arc<AlphaMap>>>,
}

impl AlphaMapCache {
    /// Create an empty cache backed by `source`.
    pub fn new(source: impl ReferenceSource + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
            small: Mutex::new(None),
            large: Mutex::new(None),
        }
    }

    fn slot(&self, size: WatermarkSize) -> &Mutex<Option<Arc<AlphaMap>>> {
        match size {
            WatermarkSize::Small => &self.small,
            WatermarkSize::Large => &self.large,
        }
    }

    /// Get the alpha map for `size`, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates asset load and decode failures from the first build.
    /// Failures are not cached; the next call tries again.
    pub fn get(&self, size: WatermarkSize) -> Result<Arc<AlphaMap>> {
        let slot = self.slot(size);
        if let Some(map) = slot.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(map));
        }

        // Built outside the lock so a slow decode does not block the other size.
        let bytes = self.source.load(size)?;
        let built = Arc::new(AlphaMap::decode(&bytes, size)?);
        log::debug!("built {0}x{0} alpha map", size.edge());

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(guard.get_or_insert(built)))
    }

    /// Whether the map for `size` has been built.
    #[must_use]
    pub fn is_cached(&self, size: WatermarkSize) -> bool {
        self.slot(size)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for AlphaMapCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaMapCache")
            .field("small", &self.is_cached(WatermarkSize::Small))
            .field("large", &self.is_cached(WatermarkSize::Large))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::codec::{ImageCodec, PngCodec};

    /// Encode a synthetic reference capture whose brightest channel tops out
    /// at `peak`.
    pub(crate) fn reference_png(edge: u32, peak: u8) -> Vec<u8> {
        let img = RgbaImage::from_fn(edge, edge, |x, y| {
            let v = u32::from(peak) * ((x + y) % edge) / edge;
            #[allow(clippy::cast_possible_truncation)]
            let v = v as u8;
            image::Rgba([v / 2, v, v / 3, 255])
        });
        PngCodec.encode(&img).unwrap()
    }

    pub(crate) fn synthetic_source() -> InMemorySource {
        InMemorySource::new(reference_png(48, 127), reference_png(96, 127))
    }

    struct CountingSource {
        inner: InMemorySource,
        loads: Arc<AtomicUsize>,
    }

    impl ReferenceSource for CountingSource {
        fn load(&self, size: WatermarkSize) -> Result<Vec<u8>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(size)
        }
    }

    #[test]
    fn alpha_is_brightest_channel_over_255() {
        let img = RgbaImage::from_vec(2, 1, vec![255, 0, 0, 255, 10, 51, 20, 0]).unwrap();
        let map = calculate_alpha_map(&img);
        assert!((map[0] - 1.0).abs() < 1e-6);
        assert!((map[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn alpha_values_stay_in_unit_range() {
        let map = AlphaMap::decode(&reference_png(96, 255), WatermarkSize::Large).unwrap();
        assert_eq!(map.size(), 96);
        assert_eq!(map.values().len(), 96 * 96);
        assert!(map.values().iter().all(|a| (0.0..=1.0).contains(a)));
    }

    #[test]
    fn wrong_reference_size_is_rejected() {
        let err = AlphaMap::decode(&reference_png(48, 100), WatermarkSize::Large).unwrap_err();
        assert!(matches!(
            err,
            Error::ReferenceSize {
                size: 96,
                width: 48,
                height: 48
            }
        ));
    }

    #[test]
    fn cache_builds_each_size_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = AlphaMapCache::new(CountingSource {
            inner: synthetic_source(),
            loads: Arc::clone(&loads),
        });

        assert!(!cache.is_cached(WatermarkSize::Small));
        let first = cache.get(WatermarkSize::Small).unwrap();
        let second = cache.get(WatermarkSize::Small).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(!cache.is_cached(WatermarkSize::Large));

        cache.get(WatermarkSize::Large).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_asset_is_fatal_and_not_cached() {
        let source = InMemorySource::default().with(WatermarkSize::Small, reference_png(48, 50));
        let cache = AlphaMapCache::new(source);
        assert!(cache.get(WatermarkSize::Small).is_ok());
        let err = cache.get(WatermarkSize::Large).unwrap_err();
        assert!(matches!(err, Error::ReferenceLoad { size: 96, .. }));
        assert!(!cache.is_cached(WatermarkSize::Large));
    }

    #[test]
    fn directory_source_reads_named_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg_48.png"), reference_png(48, 90)).unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.dir(), dir.path());
        assert!(source.load(WatermarkSize::Small).is_ok());
        assert!(matches!(
            source.load(WatermarkSize::Large),
            Err(Error::ReferenceLoad { size: 96, .. })
        ));
    }
}
