//! Async variant of the invocation protocol.
//!
//! Same steps as the synchronous engine; each hook, each Around stage and the
//! original body are awaited before the next one starts.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::Instrument;

use super::CallSite;
use crate::advice::{AdviceEntry, AsyncAroundFn, Handler};
use crate::error::BoxError;
use crate::joinpoint::{AsyncJoinPoint, Metadata};
use crate::method::{AsyncFn, CallResult};
use crate::object::Receiver;

/// Replacement for an async slot.
pub(crate) fn woven_async(site: Arc<CallSite>, original: AsyncFn) -> AsyncFn {
    Arc::new(move |receiver: Receiver, args: Vec<Value>| {
        let span = site.span(&receiver);
        let site = Arc::clone(&site);
        let original = Arc::clone(&original);
        async move { run_async(&site, original, receiver, args).await }
            .instrument(span)
            .boxed()
    })
}

async fn run_async(site: &CallSite, original: AsyncFn, receiver: Receiver, args: Vec<Value>) -> CallResult {
    let plan = site.plan();
    plan.ensure_async(&site.type_name, &site.method_name)?;

    let mut meta = site.metadata(receiver, args);
    run_hooks(&plan.before, &mut meta).await?;

    let chain: Vec<AsyncAroundFn> = plan
        .around
        .iter()
        .filter_map(|entry| match entry.handler() {
            Handler::AsyncAround(handler) => Some(Arc::clone(handler)),
            _ => None,
        })
        .collect();
    let mut join_point = AsyncJoinPoint::new(meta, chain, original);
    join_point.advance().await?;

    let mut meta = join_point.into_metadata();
    run_hooks(&plan.after, &mut meta).await?;

    Ok(meta.result)
}

/// Sync hooks run inline; async hooks are awaited.
async fn run_hooks(entries: &[Arc<AdviceEntry>], meta: &mut Metadata) -> Result<(), BoxError> {
    for entry in entries {
        match entry.handler() {
            Handler::Hook(hook) => hook(meta)?,
            Handler::AsyncHook(hook) => hook(meta).await?,
            Handler::Around(_) | Handler::AsyncAround(_) => {}
        }
    }
    Ok(())
}
