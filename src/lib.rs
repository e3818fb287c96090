//! raycanvas
//!
//! Request/response plumbing for painting engine-generated RGBA frames onto a
//! display surface. A caller describes "give me a W×H image, optionally
//! focused at P"; the pixel engine behind an async boundary produces the raw
//! buffer; the render pipeline validates it and blits it onto the surface.
//!
//! # Features
//!
//! - **Request builder**: validated `GenerationRequest`s from form values and
//!   pointer events
//! - **Engine handle**: one lazily loaded engine per handle, shared by every
//!   render
//! - **Render pipeline**: dimension reconciliation and whole-frame transfer;
//!   the last good frame survives every failure
//! - **Worker engine** (`worker`, default): an out-of-process engine speaking
//!   JSON lines
//!
//! # Example
//!
//! ```no_run
//! use raycanvas::{FormValues, RenderConfig};
//!
//! # async fn run() -> raycanvas::Result<()> {
//! let session = raycanvas::new_session(RenderConfig::default());
//! session.page_loaded().await?;
//! session.form_submitted(&FormValues::new("150", "200")).await?;
//! println!("digest: {}", session.with_surface(|s| s.digest()));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod engine;
pub mod request;
pub mod rendering;
pub mod session;
pub mod worker;

pub use engine::{EngineHandle, EngineLoader, EngineResponse, EngineState, GradientEngine, PixelEngine};
pub use rendering::surface::{DisplaySurface, MemorySurface};
pub use rendering::{Diagnostic, RenderOutcome, RenderPipeline};
pub use request::{build, FocusPoint, FormValues, GenerationRequest, Offset, PointerEvent, RequestBuilder};
pub use session::Session;

/// Which frame wins when two renders overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Whichever response arrives last is shown, even if it was requested first
    #[default]
    LastResponseWins,
    /// Responses older than the newest frame already shown are discarded
    LatestRequestWins,
}

/// Configuration for requests and presentation
///
/// The defaults match a plain page: 300×300 frames, a generous device limit
/// and the `(-1000, -1000)` focus sentinel used where "no focus" cannot be
/// expressed on the wire.
///
/// # Examples
///
/// ```
/// let cfg = raycanvas::RenderConfig::default();
/// assert_eq!(cfg.default_width, 300);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width used when the form supplies none
    pub default_width: u32,
    /// Height used when the form supplies none
    pub default_height: u32,
    /// Largest width or height the display surface accepts
    pub max_surface_dimension: u32,
    /// Focus value sent across boundaries that have no "absent" encoding
    pub focus_sentinel: FocusPoint,
    /// Presentation policy for overlapping renders
    pub ordering: OrderingPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_width: 300,
            default_height: 300,
            max_surface_dimension: 16384,
            focus_sentinel: FocusPoint { x: -1000.0, y: -1000.0 },
            ordering: OrderingPolicy::default(),
        }
    }
}

impl RenderConfig {
    /// Reject configurations that could never produce a frame
    pub fn validate(&self) -> Result<()> {
        if self.default_width == 0 || self.default_height == 0 {
            return Err(Error::ConfigError("default dimensions must be positive".to_string()));
        }
        if self.max_surface_dimension == 0 {
            return Err(Error::ConfigError("max_surface_dimension must be positive".to_string()));
        }
        if self.default_width > self.max_surface_dimension
            || self.default_height > self.max_surface_dimension
        {
            return Err(Error::ConfigError(format!(
                "default size {}x{} exceeds max_surface_dimension {}",
                self.default_width, self.default_height, self.max_surface_dimension
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: RenderConfig =
            serde_json::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&text)
    }
}

/// Create a session backed by the built-in gradient engine and an in-memory
/// surface sized to the configured defaults.
pub fn new_session(config: RenderConfig) -> Session<MemorySurface> {
    let surface = MemorySurface::from_config(&config);
    Session::new(config, EngineHandle::builtin(), surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.default_width, 300);
        assert_eq!(config.default_height, 300);
        assert_eq!(config.ordering, OrderingPolicy::LastResponseWins);
        assert_eq!(config.focus_sentinel, FocusPoint::new(-1000.0, -1000.0));
    }

    #[test]
    fn config_from_partial_json_keeps_defaults() {
        let cfg = RenderConfig::from_json(r#"{"default_width": 640, "ordering": "latest-request-wins"}"#)
            .unwrap();
        assert_eq!(cfg.default_width, 640);
        assert_eq!(cfg.default_height, 300);
        assert_eq!(cfg.ordering, OrderingPolicy::LatestRequestWins);
    }

    #[test]
    fn config_rejects_zero_defaults() {
        let err = RenderConfig::from_json(r#"{"default_height": 0}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = RenderConfig::from_json(r#"{"max_surface_dimension": 100}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn config_rejects_bad_json() {
        assert!(matches!(RenderConfig::from_json("{"), Err(Error::ConfigError(_))));
    }
}
