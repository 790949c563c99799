//! Error types for the banana-watermark-removal crate.

/// Errors that can occur while restoring a watermarked image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to decode a reference capture into pixels.
    #[error("failed to decode {size}x{size} reference image: {source}")]
    AlphaMapDecode {
        /// Nominal edge length of the reference capture.
        size: u32,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// The reference capture could not be read from its source.
    #[error("failed to load {size}x{size} reference image: {source}")]
    ReferenceLoad {
        /// Nominal edge length of the reference capture.
        size: u32,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The reference capture decoded to unexpected dimensions.
    #[error("reference image is {width}x{height}, expected {size}x{size}")]
    ReferenceSize {
        /// Expected edge length.
        size: u32,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },

    /// The input image could not be decoded.
    #[error("failed to decode input image: {0}")]
    Decode(image::ImageError),

    /// The processed pixels could not be encoded.
    #[error("failed to encode output image: {0}")]
    Encode(image::ImageError),

    /// A raw pixel array does not match its declared dimensions.
    #[error("pixel buffer of {len} bytes does not hold a {width}x{height} RGBA image")]
    InvalidBuffer {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
        /// Actual length of the byte array.
        len: usize,
    },

    /// A watermark mode string was not recognised.
    #[error("unknown watermark mode: {0}")]
    UnknownMode(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
