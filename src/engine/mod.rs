//! The engine boundary: the opaque, asynchronous pixel generator.
//!
//! Nothing in this crate depends on how pixels are computed. An engine only
//! has to answer a `GenerationRequest` with an `EngineResponse`; the dimensions
//! it reports are authoritative, and the render pipeline checks the buffer
//! against them.

use crate::request::{rgba_len, GenerationRequest};
use crate::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

pub mod gradient;
pub mod handle;

pub use gradient::GradientEngine;
pub use handle::{EngineHandle, EngineState};

/// Raw engine output: reported size plus an RGBA buffer, row-major, no padding
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl EngineResponse {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// Buffer length implied by the reported dimensions, `None` if the size
    /// is not addressable
    pub fn expected_len(&self) -> Option<usize> {
        rgba_len(self.width, self.height)
    }
}

/// An image generator reachable through the engine boundary.
///
/// `generate` suspends the caller until the engine produces a frame or fails.
/// Implementations report their own failures as `Error::Engine`.
pub trait PixelEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str {
        "engine"
    }

    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<EngineResponse>>;
}

/// One-time asynchronous resolution of an engine.
///
/// `EngineHandle` calls `load` at most once; the result, success or failure,
/// is kept for the lifetime of the handle.
pub trait EngineLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PixelEngine>>>;
}

/// Loader for the in-process `GradientEngine`
#[derive(Debug, Clone, Default)]
pub struct BuiltinLoader {
    engine: GradientEngine,
}

impl BuiltinLoader {
    pub fn new(engine: GradientEngine) -> Self {
        Self { engine }
    }
}

impl EngineLoader for BuiltinLoader {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PixelEngine>>> {
        let engine: Arc<dyn PixelEngine> = Arc::new(self.engine.clone());
        Box::pin(async move { Ok::<_, crate::Error>(engine) })
    }
}

/// Adapts an async closure into an `EngineLoader`
pub struct FnLoader<F>(pub F);

impl<F, Fut> EngineLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Arc<dyn PixelEngine>>> + Send + 'static,
{
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PixelEngine>>> {
        Box::pin((self.0)())
    }
}
