//! Decode/encode boundary between compressed image bytes and pixel buffers.
//!
//! The restoration pipelines only ever see a [`PixelBuffer`]. Turning bytes
//! into pixels and back is delegated to an [`ImageCodec`] so callers can swap
//! in their own decoder; [`PngCodec`] is the default built on `image`.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// A mutable RGBA pixel buffer: row-major, 4 bytes per pixel.
pub type PixelBuffer = RgbaImage;

/// Converts between encoded image bytes and [`PixelBuffer`]s.
pub trait ImageCodec {
    /// Decode compressed bytes (PNG, JPEG, ...) into an RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a readable image.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer>;

    /// Encode an RGBA buffer into output bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the encoder fails.
    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>>;
}

/// Decodes any format `image` recognises and always encodes PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
        Ok(img.to_rgba8())
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Png)
            .map_err(Error::Encode)?;
        Ok(out.into_inner())
    }
}

/// Wrap a raw RGBA byte array as a [`PixelBuffer`].
///
/// # Errors
///
/// Returns [`Error::InvalidBuffer`] if `data` is not exactly
/// `width * height * 4` bytes long.
pub fn buffer_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<PixelBuffer> {
    let len = data.len();
    RgbaImage::from_raw(width, height, data).ok_or(Error::InvalidBuffer { width, height, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_codec_preserves_pixels() {
        let mut img = RgbaImage::new(7, 5);
        for (x, y, px) in img.enumerate_pixels_mut() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *px = image::Rgba([(x * 30) as u8, (y * 40) as u8, 17, 200]);
            }
        }

        let codec = PngCodec;
        let bytes = codec.encode(&img).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = PngCodec.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn buffer_from_raw_checks_length() {
        assert!(buffer_from_raw(2, 2, vec![0; 16]).is_ok());
        let err = buffer_from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::InvalidBuffer { len: 15, .. }));
    }
}
