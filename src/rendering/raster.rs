/// Device-native image built from an engine buffer

use crate::request::rgba_len;
use crate::{Error, Result};

/// An RGBA image ready to blit, the equivalent of a canvas `ImageData`.
///
/// Construction copies the engine's buffer, so the buffer can be dropped as
/// soon as this exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Copy `pixels` into a fresh image, failing with `TransferFailure` when
    /// the size is zero, exceeds `max_dimension`, or does not match the buffer.
    pub fn from_rgba(width: u32, height: u32, pixels: &[u8], max_dimension: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::TransferFailure(format!("cannot create a {}x{} image", width, height)));
        }
        if width > max_dimension || height > max_dimension {
            return Err(Error::TransferFailure(format!(
                "{}x{} exceeds the device limit of {} pixels per side",
                width, height, max_dimension
            )));
        }
        if rgba_len(width, height) != Some(pixels.len()) {
            return Err(Error::TransferFailure(format!(
                "image data length {} does not fit {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data: pixels.to_vec(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_copies_matching_buffer() {
        let px = vec![7u8; 128 * 64 * 4];
        let img = RasterImage::from_rgba(128, 64, &px, 4096).unwrap();
        assert_eq!(img.width(), 128);
        assert_eq!(img.height(), 64);
        assert_eq!(img.data(), &px[..]);
    }

    #[test]
    fn raster_rejects_device_limits() {
        let err = RasterImage::from_rgba(8, 2, &[0; 64], 4).unwrap_err();
        assert!(matches!(err, Error::TransferFailure(_)));
        let err = RasterImage::from_rgba(0, 2, &[], 4).unwrap_err();
        assert!(matches!(err, Error::TransferFailure(_)));
        let err = RasterImage::from_rgba(2, 2, &[0; 15], 4).unwrap_err();
        assert!(matches!(err, Error::TransferFailure(_)));
        let err = RasterImage::from_rgba(u32::MAX, u32::MAX, &[0; 16], u32::MAX).unwrap_err();
        assert!(matches!(err, Error::TransferFailure(_)));
    }
}
