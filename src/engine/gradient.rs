//! Built-in deterministic engine.
//!
//! Paints a red/green ramp across the frame and brightens a halo around the
//! focus point when one is given. Frames larger than `max_dimension` on
//! either side are clamped, so the reported size can differ from the
//! requested one.

use super::{EngineResponse, PixelEngine};
use crate::request::{rgba_len, FocusPoint, GenerationRequest};
use crate::Result;
use futures::future::BoxFuture;

#[derive(Debug, Clone, PartialEq)]
pub struct GradientEngine {
    max_dimension: u32,
}

impl Default for GradientEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientEngine {
    pub fn new() -> Self {
        Self { max_dimension: 4096 }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension: max_dimension.max(1) }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Synchronous render; `generate` wraps this
    pub fn render(&self, request: &GenerationRequest) -> EngineResponse {
        let width = request.width.min(self.max_dimension);
        let height = request.height.min(self.max_dimension);
        let mut pixels = Vec::with_capacity(rgba_len(width, height).unwrap_or(0));

        let radius = (width.min(height) as f64 / 4.0).max(1.0);
        for y in 0..height {
            for x in 0..width {
                let r = (x as u64 * 255 / width as u64) as u8;
                let g = (y as u64 * 255 / height as u64) as u8;
                let b = ((x as u64 + y as u64) * 255 / (width as u64 + height as u64)) as u8;
                let glow = request.focus.map_or(0.0, |f| halo(f, x, y, radius));
                pixels.push(lighten(r, glow));
                pixels.push(lighten(g, glow));
                pixels.push(lighten(b, glow));
                pixels.push(255);
            }
        }

        EngineResponse::new(width, height, pixels)
    }
}

// 1.0 at the focus, falling linearly to 0.0 at `radius`
fn halo(focus: FocusPoint, x: u32, y: u32, radius: f64) -> f64 {
    let dx = x as f64 + 0.5 - focus.x;
    let dy = y as f64 + 0.5 - focus.y;
    (1.0 - (dx * dx + dy * dy).sqrt() / radius).clamp(0.0, 1.0)
}

fn lighten(channel: u8, amount: f64) -> u8 {
    let c = channel as f64;
    (c + (255.0 - c) * amount).round() as u8
}

impl PixelEngine for GradientEngine {
    fn name(&self) -> &str {
        "gradient"
    }

    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<EngineResponse>> {
        Box::pin(async move { Ok::<_, crate::Error>(self.render(&request)) })
    }
}
