//! Render pipeline: dispatch, dimension reconciliation, transfer.
//!
//! A render suspends only while the engine works. Once the response is back,
//! reconciliation and transfer run synchronously under the surface lock, so a
//! frame is either presented whole or not at all.

pub mod raster;
pub mod surface;

use crate::engine::{EngineHandle, EngineResponse};
use crate::request::GenerationRequest;
use crate::{Error, ErrorKind, OrderingPolicy, RenderConfig, Result};
use log::{debug, error, warn};
use raster::RasterImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use surface::DisplaySurface;

type OnDiagnosticHandler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// A failure reported to the diagnostic channel
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    /// Dispatch sequence number, when the failure happened after dispatch
    pub sequence: Option<u64>,
}

/// What happened to a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The frame is on the surface
    Drawn { sequence: u64, width: u32, height: u32 },
    /// A newer frame was already shown (`LatestRequestWins` only)
    Discarded { sequence: u64 },
}

/// Executes requests end to end against one engine handle.
///
/// Every dispatch gets a sequence number from an incrementing counter. Under
/// `LatestRequestWins` a response is dropped at the transfer step if a higher
/// sequence number has already been drawn; nothing in flight is cancelled.
pub struct RenderPipeline {
    engine: EngineHandle,
    ordering: OrderingPolicy,
    next_sequence: AtomicU64,
    highest_drawn: AtomicU64,
    on_diagnostic: Option<OnDiagnosticHandler>,
}

impl RenderPipeline {
    pub fn new(engine: EngineHandle, config: &RenderConfig) -> Self {
        Self {
            engine,
            ordering: config.ordering,
            next_sequence: AtomicU64::new(0),
            highest_drawn: AtomicU64::new(0),
            on_diagnostic: None,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    /// Register a callback for every reported failure
    pub fn on_diagnostic<F>(&mut self, cb: F)
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.on_diagnostic = Some(Arc::new(cb));
    }

    /// Remove previously registered on_diagnostic callback if any
    pub fn clear_on_diagnostic(&mut self) {
        self.on_diagnostic = None;
    }

    /// Log a failure and forward it to the diagnostic callback
    pub fn report(&self, sequence: Option<u64>, err: &Error) {
        match sequence {
            Some(seq) => error!("render #{} failed: {}", seq, err),
            None => error!("render rejected: {}", err),
        }
        if let Some(cb) = &self.on_diagnostic {
            cb(&Diagnostic {
                kind: err.kind(),
                message: err.to_string(),
                sequence,
            });
        }
    }

    /// Dispatch `request`, then reconcile and transfer the response onto
    /// `surface`. On any error the surface keeps its previous frame.
    pub async fn render<S: DisplaySurface>(
        &self,
        request: GenerationRequest,
        surface: &Mutex<S>,
    ) -> Result<RenderOutcome> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "dispatch #{} {}x{} focus={:?}",
            sequence, request.width, request.height, request.focus
        );

        let response = match self.engine.generate(request).await {
            Ok(r) => r,
            Err(err) => {
                self.report(Some(sequence), &err);
                return Err(err);
            }
        };

        if (response.width, response.height) != (request.width, request.height) {
            warn!(
                "engine answered #{} with {}x{} (requested {}x{})",
                sequence, response.width, response.height, request.width, request.height
            );
        }

        let mut guard = surface.lock().unwrap_or_else(|e| e.into_inner());

        if self.ordering == OrderingPolicy::LatestRequestWins
            && sequence < self.highest_drawn.load(Ordering::SeqCst)
        {
            warn!("discarding stale frame #{}", sequence);
            return Ok(RenderOutcome::Discarded { sequence });
        }

        match present(&response, &mut *guard) {
            Ok(()) => {
                self.highest_drawn.fetch_max(sequence, Ordering::SeqCst);
                debug!("drew #{} {}x{}", sequence, response.width, response.height);
                Ok(RenderOutcome::Drawn {
                    sequence,
                    width: response.width,
                    height: response.height,
                })
            }
            Err(err) => {
                drop(guard);
                self.report(Some(sequence), &err);
                Err(err)
            }
        }
    }
}

/// Check that the buffer matches the dimensions the engine reported.
///
/// The reported dimensions are authoritative, even when they differ from
/// what was requested. A size whose byte length does not fit in `usize` is
/// malformed, with `expected` saturated at `usize::MAX`.
pub fn reconcile(response: &EngineResponse) -> Result<(u32, u32)> {
    let actual = response.pixels.len();
    match response.expected_len() {
        Some(expected) if expected == actual => Ok((response.width, response.height)),
        expected => Err(Error::MalformedResponse {
            width: response.width,
            height: response.height,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        }),
    }
}

// Reconcile, build the raster, blit. Nothing touches the surface until the
// raster exists.
fn present<S: DisplaySurface + ?Sized>(response: &EngineResponse, surface: &mut S) -> Result<()> {
    let (width, height) = reconcile(response)?;
    let image = RasterImage::from_rgba(width, height, &response.pixels, surface.max_dimension())?;
    surface.draw_pixels(&image)
}
