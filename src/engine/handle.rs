//! Lazily loaded, shared engine handle

use super::{BuiltinLoader, EngineLoader, EngineResponse, GradientEngine, PixelEngine};
use crate::request::GenerationRequest;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Where a handle is in its load lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not loaded yet, or a load is in flight
    NotReady,
    Ready,
    /// The single load attempt failed; every later call fails the same way
    Failed,
}

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn PixelEngine>>>>;

struct Inner {
    // Every caller polls a clone of this one future, so a caller dropped
    // mid-load hands the same load on to the next one.
    load: LoadFuture,
    slot: OnceCell<Result<Arc<dyn PixelEngine>>>,
    attempts: Arc<AtomicUsize>,
}

/// Cloneable handle to one engine instance.
///
/// The first caller of `get` starts the loader; callers arriving while that
/// load is pending wait on the same load instead of starting their own, even
/// if the first caller gives up. A failed load is terminal for the handle:
/// there is no reload.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Inner>,
}

impl EngineHandle {
    pub fn new(loader: impl EngineLoader + 'static) -> Self {
        let attempts = Arc::new(AtomicUsize::new(0));
        Self {
            inner: Arc::new(Inner {
                load: load_once(Box::new(loader), attempts.clone()),
                slot: OnceCell::new(),
                attempts,
            }),
        }
    }

    /// Handle over the default in-process `GradientEngine`
    pub fn builtin() -> Self {
        Self::new(BuiltinLoader::new(GradientEngine::new()))
    }

    /// Handle that is already `Ready` with the given engine
    pub fn ready(engine: Arc<dyn PixelEngine>) -> Self {
        let loaded: Result<Arc<dyn PixelEngine>> = Ok(engine);
        Self {
            inner: Arc::new(Inner {
                load: futures::future::ready(loaded.clone()).boxed().shared(),
                slot: OnceCell::new_with(Some(loaded)),
                attempts: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn state(&self) -> EngineState {
        match self.inner.slot.get() {
            None => EngineState::NotReady,
            Some(Ok(_)) => EngineState::Ready,
            Some(Err(_)) => EngineState::Failed,
        }
    }

    /// Number of times the loader has actually been run (0 or 1)
    pub fn load_attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Resolve the engine, loading it on first use
    pub async fn get(&self) -> Result<Arc<dyn PixelEngine>> {
        let inner = &self.inner;
        let slot = inner.slot.get_or_init(|| inner.load.clone()).await;
        slot.clone()
    }

    /// Dispatch one request across the boundary
    pub async fn generate(&self, request: GenerationRequest) -> Result<EngineResponse> {
        let engine = self.get().await?;
        engine.generate(request).await
    }
}

fn load_once(loader: Box<dyn EngineLoader>, attempts: Arc<AtomicUsize>) -> LoadFuture {
    async move {
        attempts.fetch_add(1, Ordering::SeqCst);
        debug!("loading engine");
        match loader.load().await {
            Ok(engine) => {
                info!("engine '{}' ready", engine.name());
                Ok(engine)
            }
            Err(err) => {
                let err = match err {
                    Error::EngineLoadFailure(_) => err,
                    other => Error::EngineLoadFailure(other.to_string()),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }
    .boxed()
    .shared()
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state())
            .field("attempts", &self.load_attempts())
            .finish()
    }
}
