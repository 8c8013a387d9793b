//! Invocation engine: the call-time protocol of a woven method.
//!
//! Every call of a woven slot:
//! 1. builds fresh [`Metadata`] for the join point,
//! 2. asks the registry for the matching advice of each phase,
//! 3. runs Before hooks in declaration order,
//! 4. runs the Around chain (first registered outermost, original innermost),
//! 5. runs After hooks in declaration order,
//! 6. returns `result`.
//!
//! Advice is looked up per call, so entries registered after the slot was
//! woven apply to the next call. The first failure aborts the remaining steps
//! and reaches the caller unchanged.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, debug_span, Span};

use crate::advice::{AdviceEntry, AdvicePlan, AdviceRegistry, AroundFn, Handler};
use crate::error::BoxError;
use crate::joinpoint::{JoinPoint, Metadata};
use crate::marker::MarkerQuery;
use crate::method::{CallResult, SyncFn};
use crate::object::Receiver;
use crate::pointcut::Candidate;

mod asynchronous;

pub(crate) use asynchronous::woven_async;

/// Everything a woven slot needs at call time, shared by all its calls.
pub(crate) struct CallSite {
    registry: Arc<AdviceRegistry>,
    markers: Arc<dyn MarkerQuery>,
    /// Declaring type of the woven slot.
    type_name: String,
    method_name: String,
    trace_calls: bool,
}

impl CallSite {
    pub(crate) fn new(
        registry: Arc<AdviceRegistry>,
        markers: Arc<dyn MarkerQuery>,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
        trace_calls: bool,
    ) -> Self {
        Self {
            registry,
            markers,
            type_name: type_name.into(),
            method_name: method_name.into(),
            trace_calls,
        }
    }

    /// Matching advice for this join point as of now.
    fn plan(&self) -> AdvicePlan {
        let markers = self.markers.markers_on(&self.type_name, &self.method_name);
        let plan = self.registry.plan(&Candidate {
            method_name: &self.method_name,
            type_name: &self.type_name,
            markers: &markers,
        });

        if self.trace_calls {
            debug!(
                before = plan.before.len(),
                around = plan.around.len(),
                after = plan.after.len(),
                "Advice plan"
            );
        }
        plan
    }

    fn metadata(&self, receiver: Receiver, args: Vec<Value>) -> Metadata {
        Metadata::new(
            self.method_name.clone(),
            self.type_name.clone(),
            receiver,
            args,
            Arc::clone(&self.markers),
        )
    }

    fn span(&self, receiver: &Receiver) -> Span {
        debug_span!(
            "woven_call",
            type_name = %self.type_name,
            method = %self.method_name,
            receiver = %receiver.id()
        )
    }
}

/// Replacement for a synchronous slot.
pub(crate) fn woven_sync(site: Arc<CallSite>, original: SyncFn) -> SyncFn {
    Arc::new(move |receiver: &Receiver, args: Vec<Value>| {
        let span = site.span(receiver);
        let _entered = span.enter();
        run_sync(&site, &original, receiver, args)
    })
}

fn run_sync(site: &CallSite, original: &SyncFn, receiver: &Receiver, args: Vec<Value>) -> CallResult {
    let plan = site.plan();
    plan.ensure_sync(&site.type_name, &site.method_name)?;

    let mut meta = site.metadata(Arc::clone(receiver), args);
    run_hooks(&plan.before, &mut meta)?;

    let chain: Vec<AroundFn> = plan
        .around
        .iter()
        .filter_map(|entry| match entry.handler() {
            Handler::Around(handler) => Some(Arc::clone(handler)),
            _ => None,
        })
        .collect();
    let mut join_point = JoinPoint::new(meta, chain, Arc::clone(original));
    join_point.advance()?;

    let mut meta = join_point.into_metadata();
    run_hooks(&plan.after, &mut meta)?;

    Ok(meta.result)
}

fn run_hooks(entries: &[Arc<AdviceEntry>], meta: &mut Metadata) -> Result<(), BoxError> {
    for entry in entries {
        if let Handler::Hook(hook) = entry.handler() {
            hook(meta)?;
        }
    }
    Ok(())
}
