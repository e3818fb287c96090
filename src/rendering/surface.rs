//! Display surfaces: where finished frames land.

use crate::rendering::raster::RasterImage;
use crate::request::Offset;
use crate::{Error, RenderConfig, Result};
use sha2::{Digest, Sha256};

/// The on-screen region a render pipeline paints into.
///
/// `draw_pixels` adopts the image's size and replaces the whole surface; there
/// is no blending with the previous frame. Implementations must leave the
/// surface untouched when they return an error.
pub trait DisplaySurface: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Viewport position of the top-left corner, used to translate pointer events
    fn top_left_offset(&self) -> Offset;

    /// Largest width or height the device can hold
    fn max_dimension(&self) -> u32;

    fn draw_pixels(&mut self, image: &RasterImage) -> Result<()>;
}

/// Surface backed by a plain RGBA vector
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    offset: Offset,
    max_dimension: u32,
    pixels: Vec<u8>,
    frames_drawn: u64,
}

impl MemorySurface {
    /// A transparent surface of the given size at the viewport origin
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset: Offset::default(),
            max_dimension: RenderConfig::default().max_surface_dimension,
            pixels: vec![0; crate::request::rgba_len(width, height).unwrap_or(0)],
            frames_drawn: 0,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.default_width, config.default_height)
            .with_max_dimension(config.max_surface_dimension)
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn set_offset(&mut self, offset: Offset) {
        self.offset = offset;
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, if inside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Hex sha256 over the size and contents
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.pixels);
        hex::encode(hasher.finalize())
    }
}

impl DisplaySurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn top_left_offset(&self) -> Offset {
        self.offset
    }

    fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn draw_pixels(&mut self, image: &RasterImage) -> Result<()> {
        if image.width() > self.max_dimension || image.height() > self.max_dimension {
            return Err(Error::TransferFailure(format!(
                "{}x{} does not fit a surface limited to {}",
                image.width(),
                image.height(),
                self.max_dimension
            )));
        }
        self.width = image.width();
        self.height = image.height();
        self.pixels.clear();
        self.pixels.extend_from_slice(image.data());
        self.frames_drawn += 1;
        Ok(())
    }
}
