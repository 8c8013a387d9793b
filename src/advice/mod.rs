//! Aspect-oriented advice: handlers and the registry that orders them.
//!
//! Advice is registered at aspect definition time and looked up on every call
//! of a woven method, so advice registered after a type was woven still
//! applies to later calls.
//!
//! # Phases
//!
//! - **Before**: runs first, in declaration order. A failure aborts the call.
//! - **Around**: composed into one nested chain, first registered outermost.
//!   Each handler decides whether and when to `invoke` the next stage.
//! - **After**: runs once the chain completed successfully, in declaration
//!   order.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::{BoxError, Result, WeaveError};
use crate::joinpoint::{AsyncJoinPoint, JoinPoint, Metadata};
use crate::pointcut::{Candidate, Pointcut, PointcutSpec};

mod registry;

pub use registry::{AdvicePlan, AdviceRegistry};

/// When an advice handler runs relative to the intercepted method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    Around,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Before => "before",
            Phase::Around => "around",
            Phase::After => "after",
        })
    }
}

/// Synchronous Before/After handler.
pub type HookFn = Arc<dyn Fn(&mut Metadata) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Asynchronous Before/After handler.
pub type AsyncHookFn = Arc<
    dyn for<'a> Fn(&'a mut Metadata) -> BoxFuture<'a, std::result::Result<(), BoxError>>
        + Send
        + Sync,
>;

/// Synchronous Around handler.
pub type AroundFn = Arc<dyn Fn(&mut JoinPoint) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Asynchronous Around handler.
pub type AsyncAroundFn = Arc<
    dyn for<'a> Fn(&'a mut AsyncJoinPoint) -> BoxFuture<'a, std::result::Result<(), BoxError>>
        + Send
        + Sync,
>;

/// An advice handler.
///
/// Hooks serve the Before and After phases; Around handlers get a join point
/// they can `invoke`. Async handlers only apply to async methods; sync hooks
/// apply to both flavors.
#[derive(Clone)]
pub enum Handler {
    Hook(HookFn),
    AsyncHook(AsyncHookFn),
    Around(AroundFn),
    AsyncAround(AsyncAroundFn),
}

impl Handler {
    /// Synchronous Before/After handler.
    pub fn hook<F>(f: F) -> Self
    where
        F: Fn(&mut Metadata) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Handler::Hook(Arc::new(f))
    }

    /// Asynchronous Before/After handler.
    ///
    /// ```ignore
    /// Handler::async_hook(|meta| Box::pin(async move {
    ///     audit.record(meta.method_name()).await;
    ///     Ok(())
    /// }))
    /// ```
    pub fn async_hook<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Metadata) -> BoxFuture<'a, std::result::Result<(), BoxError>>
            + Send
            + Sync
            + 'static,
    {
        Handler::AsyncHook(Arc::new(f))
    }

    /// Synchronous Around handler.
    pub fn around<F>(f: F) -> Self
    where
        F: Fn(&mut JoinPoint) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Handler::Around(Arc::new(f))
    }

    /// Asynchronous Around handler.
    pub fn async_around<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut AsyncJoinPoint) -> BoxFuture<'a, std::result::Result<(), BoxError>>
            + Send
            + Sync
            + 'static,
    {
        Handler::AsyncAround(Arc::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Handler::Hook(_) => "hook",
            Handler::AsyncHook(_) => "async_hook",
            Handler::Around(_) => "around",
            Handler::AsyncAround(_) => "async_around",
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::AsyncHook(_) | Handler::AsyncAround(_))
    }

    /// Whether this handler can serve `phase`.
    pub fn fits(&self, phase: Phase) -> bool {
        match self {
            Handler::Hook(_) | Handler::AsyncHook(_) => phase != Phase::Around,
            Handler::Around(_) | Handler::AsyncAround(_) => phase == Phase::Around,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}

/// One registered piece of advice.
#[derive(Debug)]
pub struct AdviceEntry {
    phase: Phase,
    pointcut: Pointcut,
    handler: Handler,
    order: u64,
}

impl AdviceEntry {
    /// Compile `spec` and pair it with `handler`.
    pub(crate) fn new(phase: Phase, spec: &PointcutSpec, handler: Handler, order: u64) -> Result<Self> {
        let pointcut = Pointcut::compile(spec)?;
        Self::with_pointcut(phase, pointcut, handler, order)
    }

    pub(crate) fn with_pointcut(
        phase: Phase,
        pointcut: Pointcut,
        handler: Handler,
        order: u64,
    ) -> Result<Self> {
        if !handler.fits(phase) {
            return Err(WeaveError::PhaseMismatch {
                phase,
                handler: handler.kind(),
            });
        }
        Ok(Self {
            phase,
            pointcut,
            handler,
            order,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Declaration order across the whole registry.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn applies_to(&self, candidate: &Candidate<'_>) -> bool {
        self.pointcut.matches(candidate)
    }
}
