//! Request builder: turns form values and pointer events into validated
//! `GenerationRequest`s.
//!
//! Everything here is a pure transformation. Dimensions are validated before
//! anything is dispatched; focus points are never validated and are forwarded
//! to the engine as given, including negative or out-of-range coordinates.

use crate::{Error, RenderConfig, Result};
use serde::{Deserialize, Serialize};

/// A point in surface-local pixel coordinates, used as a focus hint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport position of a display surface's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// A pointer-down interaction in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
}

/// One "give me a W×H image, optionally focused at P" request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationRequest {
    pub width: u32,
    pub height: u32,
    pub focus: Option<FocusPoint>,
}

impl GenerationRequest {
    /// Byte length of an RGBA buffer matching the requested size, `None` if
    /// it does not fit in `usize`
    pub fn buffer_len(&self) -> Option<usize> {
        rgba_len(self.width, self.height)
    }

    /// Focus point as it crosses a boundary that has no "absent" value.
    pub fn focus_or(&self, sentinel: FocusPoint) -> FocusPoint {
        self.focus.unwrap_or(sentinel)
    }
}

/// `width * height * 4` in bytes, or `None` when that overflows `usize`.
///
/// Dimensions reported by an engine are untrusted, so this never wraps.
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
}

/// Build a request from numeric width/height values.
///
/// Inputs are `f64` because they usually come from loosely typed sources
/// (form fields, script values). Fails with `InvalidDimension` when either
/// value is NaN, infinite, non-positive, fractional, or larger than `u32`.
pub fn build(width: f64, height: f64, focus: Option<FocusPoint>) -> Result<GenerationRequest> {
    let width = validate_dimension("width", width)?;
    let height = validate_dimension("height", height)?;
    Ok(GenerationRequest { width, height, focus })
}

fn validate_dimension(name: &str, value: f64) -> Result<u32> {
    if !value.is_finite() {
        return Err(Error::InvalidDimension(format!("{} is not a number ({})", name, value)));
    }
    if value <= 0.0 {
        return Err(Error::InvalidDimension(format!("{} must be positive, got {}", name, value)));
    }
    if value.fract() != 0.0 {
        return Err(Error::InvalidDimension(format!("{} must be an integer, got {}", name, value)));
    }
    if value > u32::MAX as f64 {
        return Err(Error::InvalidDimension(format!("{} is out of range ({})", name, value)));
    }
    Ok(value as u32)
}

/// Translate viewport coordinates into surface-local ones.
pub fn translate_pointer(event: PointerEvent, surface_offset: Offset) -> FocusPoint {
    FocusPoint {
        x: event.client_x - surface_offset.x,
        y: event.client_y - surface_offset.y,
    }
}

/// Raw `width`/`height` fields as submitted by a form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    pub width: Option<String>,
    pub height: Option<String>,
}

impl FormValues {
    pub fn new(width: &str, height: &str) -> Self {
        Self {
            width: Some(width.to_string()),
            height: Some(height.to_string()),
        }
    }

    /// Collect form fields from `(name, value)` pairs; unknown names are ignored
    /// and a repeated name keeps its first value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = FormValues::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "width" => &mut form.width,
                "height" => &mut form.height,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        form
    }

    /// Numeric width/height, falling back to the defaults for missing, empty
    /// or non-numeric fields. Numeric but invalid values ("0", "-5", "1.5")
    /// pass through so `build` can reject them.
    pub fn dimensions(&self, default_width: u32, default_height: u32) -> (f64, f64) {
        (
            parse_field(self.width.as_deref(), default_width),
            parse_field(self.height.as_deref(), default_height),
        )
    }
}

fn parse_field(raw: Option<&str>, default: u32) -> f64 {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return default as f64,
    };
    match raw.parse::<f64>() {
        Ok(v) if !v.is_nan() => v,
        _ => default as f64,
    }
}

/// Assembles requests using the configured default size
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    default_width: u32,
    default_height: u32,
}

impl RequestBuilder {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            default_width: config.default_width,
            default_height: config.default_height,
        }
    }

    /// Request used on page load: default size, no focus
    pub fn default_request(&self) -> Result<GenerationRequest> {
        build(self.default_width as f64, self.default_height as f64, None)
    }

    /// Explicit-size request from submitted form values
    pub fn explicit(&self, form: &FormValues) -> Result<GenerationRequest> {
        let (w, h) = form.dimensions(self.default_width, self.default_height);
        build(w, h, None)
    }

    /// Same size as the form asks for, focused where the pointer went down
    pub fn focused(
        &self,
        form: &FormValues,
        event: PointerEvent,
        surface_offset: Offset,
    ) -> Result<GenerationRequest> {
        let (w, h) = form.dimensions(self.default_width, self.default_height);
        build(w, h, Some(translate_pointer(event, surface_offset)))
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}
