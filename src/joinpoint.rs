//! Join point metadata handed to advice handlers.
//!
//! [`Metadata`] is built once per call of a woven method and dropped when the
//! call returns. Around advice receives a [`JoinPoint`] (or
//! [`AsyncJoinPoint`]), which derefs to the metadata and adds `invoke`: run
//! the next stage of the Around chain, or the original method once the chain
//! is exhausted.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::advice::{AroundFn, AsyncAroundFn};
use crate::error::BoxError;
use crate::marker::{MarkerId, MarkerQuery};
use crate::method::{AsyncFn, CallResult, SyncFn};
use crate::object::Receiver;

/// Per-call data carrier.
pub struct Metadata {
    method_name: String,
    type_name: String,
    receiver: Receiver,
    /// Arguments of the call; `invoke` replaces them with the ones it is given.
    pub args: Vec<Value>,
    /// Current result; unset until the original method runs or advice sets it.
    pub result: Option<Value>,
    markers: Arc<dyn MarkerQuery>,
}

impl Metadata {
    pub(crate) fn new(
        method_name: String,
        type_name: String,
        receiver: Receiver,
        args: Vec<Value>,
        markers: Arc<dyn MarkerQuery>,
    ) -> Self {
        Self {
            method_name,
            type_name,
            receiver,
            args,
            result: None,
            markers,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Name of the type declaring the intercepted method.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The instance the method was called on.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    /// Payload of `marker` on the intercepted method, if attached.
    pub fn marker(&self, marker: &MarkerId) -> Option<Value> {
        self.markers
            .get_marker(marker, &self.type_name, &self.method_name)
    }
}

impl std::fmt::Debug for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("method_name", &self.method_name)
            .field("type_name", &self.type_name)
            .field("receiver", &self.receiver.id())
            .field("args", &self.args)
            .field("result", &self.result)
            .finish()
    }
}

/// Metadata plus the cursor into a synchronous Around chain.
pub struct JoinPoint {
    meta: Metadata,
    chain: Vec<AroundFn>,
    next: usize,
    original: SyncFn,
}

impl JoinPoint {
    pub(crate) fn new(meta: Metadata, chain: Vec<AroundFn>, original: SyncFn) -> Self {
        Self {
            meta,
            chain,
            next: 0,
            original,
        }
    }

    /// Run the next stage with `args` and return the resulting `result`.
    ///
    /// May be called any number of times; each call re-runs everything inward
    /// of the current handler.
    pub fn invoke(&mut self, args: Vec<Value>) -> CallResult {
        self.meta.args = args;
        self.advance()?;
        Ok(self.meta.result.clone())
    }

    /// [`invoke`](Self::invoke) with the current arguments.
    pub fn proceed(&mut self) -> CallResult {
        let args = self.meta.args.clone();
        self.invoke(args)
    }

    /// Run stage `next`: an Around handler, or the original method.
    pub(crate) fn advance(&mut self) -> Result<(), BoxError> {
        match self.chain.get(self.next).cloned() {
            Some(handler) => {
                self.next += 1;
                let outcome = handler(self);
                self.next -= 1;
                outcome
            }
            None => {
                let args = self.meta.args.clone();
                self.meta.result = (self.original)(&self.meta.receiver, args)?;
                Ok(())
            }
        }
    }

    pub(crate) fn into_metadata(self) -> Metadata {
        self.meta
    }
}

impl Deref for JoinPoint {
    type Target = Metadata;

    fn deref(&self) -> &Metadata {
        &self.meta
    }
}

impl DerefMut for JoinPoint {
    fn deref_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }
}

/// Metadata plus the cursor into an asynchronous Around chain.
pub struct AsyncJoinPoint {
    meta: Metadata,
    chain: Vec<AsyncAroundFn>,
    next: usize,
    original: AsyncFn,
}

impl AsyncJoinPoint {
    pub(crate) fn new(meta: Metadata, chain: Vec<AsyncAroundFn>, original: AsyncFn) -> Self {
        Self {
            meta,
            chain,
            next: 0,
            original,
        }
    }

    /// Run the next stage with `args` and resolve to the resulting `result`.
    pub fn invoke(&mut self, args: Vec<Value>) -> BoxFuture<'_, CallResult> {
        Box::pin(async move {
            self.meta.args = args;
            self.advance().await?;
            Ok(self.meta.result.clone())
        })
    }

    /// [`invoke`](Self::invoke) with the current arguments.
    pub fn proceed(&mut self) -> BoxFuture<'_, CallResult> {
        let args = self.meta.args.clone();
        self.invoke(args)
    }

    pub(crate) fn advance(&mut self) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(async move {
            match self.chain.get(self.next).cloned() {
                Some(handler) => {
                    self.next += 1;
                    let outcome = handler(self).await;
                    self.next -= 1;
                    outcome
                }
                None => {
                    let receiver = Arc::clone(&self.meta.receiver);
                    let args = self.meta.args.clone();
                    self.meta.result = (self.original)(receiver, args).await?;
                    Ok(())
                }
            }
        })
    }

    pub(crate) fn into_metadata(self) -> Metadata {
        self.meta
    }
}

impl Deref for AsyncJoinPoint {
    type Target = Metadata;

    fn deref(&self) -> &Metadata {
        &self.meta
    }
}

impl DerefMut for AsyncJoinPoint {
    fn deref_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }
}
