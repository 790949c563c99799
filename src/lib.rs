//! Restore the watermark region of Gemini and NotebookLM image exports.
//!
//! Two generators, two techniques:
//!
//! - **Gemini** overlays a semi-transparent white logo at a fixed,
//!   size-dependent spot in the bottom-right corner. Its per-pixel opacity is
//!   known from reference captures, so the original pixels are recovered by
//!   reversing the alpha-blending equation.
//! - **NotebookLM** stamps a text/logo block whose footprint varies. It is
//!   found with a local-contrast detector and painted over with background
//!   colour sampled just above it, falling back to filling the whole nominal
//!   box when the detection is not trustworthy.
//!
//! # Quick Start
//!
//! ```no_run
//! use banana_watermark_removal::{AlphaMapCache, DirectorySource, WatermarkEngine, WatermarkMode};
//!
//! let engine = WatermarkEngine::new(AlphaMapCache::new(DirectorySource::new("assets")));
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let cleaned = engine.process_bytes(&bytes, WatermarkMode::Gemini).unwrap();
//! std::fs::write("photo_cleaned.png", cleaned).unwrap();
//! ```
//!
//! # Reference captures
//!
//! The Gemini path needs `bg_48.png` and `bg_96.png`, the logo rendered on
//! pure black. They are supplied through a [`ReferenceSource`]; use
//! [`InMemorySource`] to embed them with `include_bytes!`.

#![deny(missing_docs)]

pub mod alpha_map;
pub mod batch;
pub mod blending;
pub mod codec;
mod engine;
pub mod error;
pub mod gemini;
pub mod notebooklm;

pub use alpha_map::{AlphaMap, AlphaMapCache, DirectorySource, InMemorySource, ReferenceSource};
pub use batch::{default_output_path, is_supported_image, ProcessOptions, ProcessResult};
pub use codec::{ImageCodec, PixelBuffer, PngCodec};
pub use engine::{Outcome, WatermarkEngine, WatermarkMode};
pub use error::{Error, Result};
pub use gemini::{WatermarkPosition, WatermarkSize};
pub use notebooklm::FillStrategy;
