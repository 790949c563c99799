//! Core watermark removal engine: decode, restore in place, encode.

use std::str::FromStr;

use crate::alpha_map::AlphaMapCache;
use crate::codec::{ImageCodec, PixelBuffer, PngCodec};
use crate::error::{Error, Result};
use crate::gemini::{self, WatermarkPosition};
use crate::notebooklm::{self, FillStrategy};

/// Which generator's watermark to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum WatermarkMode {
    /// Pass the image through unchanged.
    None,
    /// Fixed-position Gemini logo, removed by reverse alpha blending.
    #[default]
    Gemini,
    /// NotebookLM export mark, removed by detection and background fill.
    #[cfg_attr(feature = "cli", value(name = "notebooklm"))]
    NotebookLm,
}

impl WatermarkMode {
    /// Resolve a mode from a loosely typed request.
    ///
    /// A recognised `mode` string wins. Otherwise the legacy boolean switch
    /// maps `true` to [`Gemini`](Self::Gemini) and `false` to
    /// [`None`](Self::None). With neither, the mode is Gemini.
    #[must_use]
    pub fn resolve(mode: Option<&str>, legacy_remove: Option<bool>) -> Self {
        if let Some(parsed) = mode.and_then(|m| m.parse().ok()) {
            return parsed;
        }
        match legacy_remove {
            Some(true) | None => Self::Gemini,
            Some(false) => Self::None,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gemini => "gemini",
            Self::NotebookLm => "notebooklm",
        }
    }
}

impl FromStr for WatermarkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gemini" => Ok(Self::Gemini),
            "notebooklm" => Ok(Self::NotebookLm),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for WatermarkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What processing did to one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Nothing was changed.
    Untouched,
    /// The Gemini logo was unblended at this position.
    Unblended(WatermarkPosition),
    /// The NotebookLM mark was painted over with this strategy.
    Filled(FillStrategy),
}

/// The watermark engine holding the alpha map cache and codec.
///
/// Create once and reuse for many images. Alpha maps are built on first use
/// and shared afterwards; each call works on its own pixel buffer.
pub struct WatermarkEngine {
    alpha_maps: AlphaMapCache,
    codec: Box<dyn ImageCodec + Send + Sync>,
}

impl WatermarkEngine {
    /// Create an engine that decodes common formats and encodes PNG.
    #[must_use]
    pub fn new(alpha_maps: AlphaMapCache) -> Self {
        Self::with_codec(alpha_maps, PngCodec)
    }

    /// Create an engine with a custom decode/encode boundary.
    pub fn with_codec(
        alpha_maps: AlphaMapCache,
        codec: impl ImageCodec + Send + Sync + 'static,
    ) -> Self {
        Self {
            alpha_maps,
            codec: Box::new(codec),
        }
    }

    /// The engine's alpha map cache.
    #[must_use]
    pub fn alpha_maps(&self) -> &AlphaMapCache {
        &self.alpha_maps
    }

    /// Remove the selected watermark from a decoded buffer in place.
    ///
    /// Not idempotent: a second Gemini pass unblends the logo square again.
    ///
    /// # Errors
    ///
    /// Returns an error only if a Gemini alpha map cannot be built.
    pub fn process_buffer(&self, buffer: &mut PixelBuffer, mode: WatermarkMode) -> Result<Outcome> {
        let outcome = match mode {
            WatermarkMode::None => Outcome::Untouched,
            WatermarkMode::Gemini => {
                Outcome::Unblended(gemini::remove_gemini_watermark(buffer, &self.alpha_maps)?)
            }
            WatermarkMode::NotebookLm => notebooklm::remove_notebooklm_watermark(buffer)
                .map_or(Outcome::Untouched, Outcome::Filled),
        };
        log::info!(
            "{mode} on {}x{}: {outcome:?}",
            buffer.width(),
            buffer.height()
        );
        Ok(outcome)
    }

    /// Decode `bytes`, remove the selected watermark and re-encode.
    ///
    /// With [`WatermarkMode::None`] the input bytes are returned as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] or [`Error::Encode`] from the codec, or an
    /// alpha map error from the Gemini path.
    pub fn process_bytes(&self, bytes: &[u8], mode: WatermarkMode) -> Result<Vec<u8>> {
        if mode == WatermarkMode::None {
            return Ok(bytes.to_vec());
        }
        self.restore_bytes(bytes, mode)
    }

    /// Like [`process_bytes`](Self::process_bytes), but always decodes and
    /// re-encodes, so [`WatermarkMode::None`] still yields the codec's output
    /// format.
    ///
    /// # Errors
    ///
    /// Same as [`process_bytes`](Self::process_bytes).
    pub fn restore_bytes(&self, bytes: &[u8], mode: WatermarkMode) -> Result<Vec<u8>> {
        let mut buffer = self.codec.decode(bytes)?;
        self.process_buffer(&mut buffer, mode)?;
        self.codec.encode(&buffer)
    }
}

impl std::fmt::Debug for WatermarkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkEngine")
            .field("alpha_maps", &self.alpha_maps)
            .finish_non_exhaustive()
    }
}
