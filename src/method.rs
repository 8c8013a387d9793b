//! Method bodies as stored in a type's method table.
//!
//! A method is either synchronous or asynchronous. Both flavors take the
//! receiver and the ordered argument list and produce an optional result;
//! `None` means "no result was set", which only happens for woven methods
//! whose Around advice never proceeded.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, TryFutureExt};
use serde_json::Value;

use crate::error::BoxError;
use crate::object::Receiver;

/// Outcome of running a method-table entry.
pub type CallResult = std::result::Result<Option<Value>, BoxError>;

/// Synchronous method-table entry.
pub type SyncFn = Arc<dyn Fn(&Receiver, Vec<Value>) -> CallResult + Send + Sync>;

/// Asynchronous method-table entry.
pub type AsyncFn = Arc<dyn Fn(Receiver, Vec<Value>) -> BoxFuture<'static, CallResult> + Send + Sync>;

/// A method-table entry.
///
/// Weaving replaces an entry with another of the same flavor, so callers never
/// need to know whether a method is woven.
#[derive(Clone)]
pub enum Method {
    /// Runs to completion on the caller's thread.
    Sync(SyncFn),
    /// Resolves to its result when awaited.
    Async(AsyncFn),
}

impl Method {
    /// Wrap a synchronous method body.
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&Receiver, Vec<Value>) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Method::Sync(Arc::new(move |receiver: &Receiver, args: Vec<Value>| {
            body(receiver, args).map(Some)
        }))
    }

    /// Wrap an asynchronous method body.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetch = Method::asynchronous(|this, args| async move {
    ///     let id = args.first().cloned().unwrap_or_default();
    ///     Ok(json!({ "id": id, "owner": this.type_name() }))
    /// });
    /// ```
    pub fn asynchronous<F, Fut>(body: F) -> Self
    where
        F: Fn(Receiver, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, BoxError>> + Send + 'static,
    {
        Method::Async(Arc::new(move |receiver: Receiver, args: Vec<Value>| {
            body(receiver, args).map_ok(Some).boxed()
        }))
    }

    /// Whether this entry must be awaited.
    pub fn is_async(&self) -> bool {
        matches!(self, Method::Async(_))
    }

    /// Short flavor label for logs and errors.
    pub fn flavor(&self) -> &'static str {
        match self {
            Method::Sync(_) => "sync",
            Method::Async(_) => "async",
        }
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Method").field(&self.flavor()).finish()
    }
}
