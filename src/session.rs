//! Page wiring: the three events that trigger a render.
//!
//! A `Session` owns the surface and routes page load, form submission and
//! pointer-down events through the request builder into the render pipeline.
//! Events can overlap; the pipeline's ordering policy decides which frame
//! ends up on screen.

use crate::engine::EngineHandle;
use crate::rendering::surface::DisplaySurface;
use crate::rendering::{Diagnostic, RenderOutcome, RenderPipeline};
use crate::request::{FormValues, GenerationRequest, PointerEvent, RequestBuilder};
use crate::{RenderConfig, Result};
use std::sync::Mutex;

pub struct Session<S: DisplaySurface> {
    builder: RequestBuilder,
    pipeline: RenderPipeline,
    surface: Mutex<S>,
}

impl<S: DisplaySurface> Session<S> {
    pub fn new(config: RenderConfig, engine: EngineHandle, surface: S) -> Self {
        Self {
            builder: RequestBuilder::new(&config),
            pipeline: RenderPipeline::new(engine, &config),
            surface: Mutex::new(surface),
        }
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Register a callback for every failure, including rejected input
    pub fn on_diagnostic<F>(&mut self, cb: F)
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.pipeline.on_diagnostic(cb);
    }

    /// Run `f` against the current surface
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.surface.lock().unwrap_or_else(|e| e.into_inner());
        f(&*guard)
    }

    /// Mutable access, e.g. to move the surface within the viewport
    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.surface.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }

    pub fn into_surface(self) -> S {
        self.surface.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    /// Page finished loading: render one frame at the default size
    pub async fn page_loaded(&self) -> Result<RenderOutcome> {
        let request = self.builder.default_request();
        self.dispatch(request).await
    }

    /// Form submitted: render at the submitted size, no focus
    pub async fn form_submitted(&self, form: &FormValues) -> Result<RenderOutcome> {
        let request = self.builder.explicit(form);
        self.dispatch(request).await
    }

    /// Pointer went down on the surface: same size as the form asks for,
    /// focused at the surface-local position of the pointer
    pub async fn pointer_down(&self, event: PointerEvent, form: &FormValues) -> Result<RenderOutcome> {
        let offset = self.with_surface(|s| s.top_left_offset());
        let request = self.builder.focused(form, event, offset);
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Result<GenerationRequest>) -> Result<RenderOutcome> {
        let request = match request {
            Ok(r) => r,
            Err(err) => {
                self.pipeline.report(None, &err);
                return Err(err);
            }
        };
        self.pipeline.render(request, &self.surface).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::surface::MemorySurface;
    use crate::request::Offset;
    use crate::{Error, ErrorKind};
    use std::sync::Arc;

    #[tokio::test]
    async fn page_load_renders_default_frame() {
        let session = crate::new_session(RenderConfig::default());
        session.page_loaded().await.unwrap();
        session.with_surface(|s| {
            assert_eq!((s.width(), s.height()), (300, 300));
            assert_eq!(s.frames_drawn(), 1);
        });
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_engine() {
        let mut session = Session::new(
            RenderConfig::default(),
            EngineHandle::builtin(),
            MemorySurface::new(5, 5),
        );
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = kinds.clone();
        session.on_diagnostic(move |d| sink.lock().unwrap().push((d.kind, d.sequence)));

        let err = session.form_submitted(&FormValues::new("0", "10")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(_)));
        assert_eq!(session.pipeline().engine().load_attempts(), 0);
        assert_eq!(*kinds.lock().unwrap(), vec![(ErrorKind::InvalidDimension, None)]);
        assert_eq!(session.into_surface().frames_drawn(), 0);
    }

    #[tokio::test]
    async fn pointer_down_uses_current_surface_offset() {
        let session = Session::new(
            RenderConfig::default(),
            EngineHandle::builtin(),
            MemorySurface::new(40, 40),
        );
        session.with_surface_mut(|s| s.set_offset(Offset { x: 100.0, y: 50.0 }));
        session
            .pointer_down(PointerEvent { client_x: 120.5, client_y: 70.5 }, &FormValues::new("40", "40"))
            .await
            .unwrap();
        // the halo is centred on surface-local (20.5, 20.5)
        session.with_surface(|s| assert_eq!(s.pixel(20, 20), Some([255, 255, 255, 255])));
    }
}
