//! Shared fixtures for integration tests.
//!
//! Method bodies and handlers record into a [`CallLog`] instead of printing,
//! so tests can assert the exact interleaving of advice and bodies.

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use wove::{AspectRuntime, BoxError, Handler, Method, Receiver, TypeBuilder};

pub use wove::test_utils::{Boom, CallLog};

/// Boxed [`Boom`], ready to return from a handler or body.
pub fn boom(message: &str) -> BoxError {
    Box::new(Boom::new(message))
}

/// Sync body that records `label` and returns it.
pub fn body(recorder: &CallLog, label: &str) -> Method {
    let recorder = recorder.clone();
    let label = label.to_string();
    Method::sync(move |_, _| {
        recorder.record(label.clone());
        Ok(json!(label))
    })
}

/// Sync body that records `label` and echoes its arguments.
pub fn echo(recorder: &CallLog, label: &str) -> Method {
    let recorder = recorder.clone();
    let label = label.to_string();
    Method::sync(move |_, args| {
        recorder.record(label.clone());
        Ok(Value::Array(args))
    })
}

/// Async body that yields once, records `label` and returns it.
pub fn async_body(recorder: &CallLog, label: &str) -> Method {
    let recorder = recorder.clone();
    let label = label.to_string();
    Method::asynchronous(move |_, _| {
        let recorder = recorder.clone();
        let label = label.clone();
        async move {
            tokio::task::yield_now().await;
            recorder.record(label.clone());
            Ok(json!(label))
        }
    })
}

/// Before/After hook that records `label`.
pub fn recording_hook(recorder: &CallLog, label: &str) -> Handler {
    let recorder = recorder.clone();
    let label = label.to_string();
    Handler::hook(move |_| {
        recorder.record(label.clone());
        Ok(())
    })
}

/// Before/After hook that records the intercepted method name.
pub fn method_name_hook(recorder: &CallLog) -> Handler {
    let recorder = recorder.clone();
    Handler::hook(move |meta| {
        recorder.record(meta.method_name());
        Ok(())
    })
}

/// Around handler that records `label-pre`, proceeds, then records
/// `label-post`.
pub fn recording_around(recorder: &CallLog, label: &str) -> Handler {
    let recorder = recorder.clone();
    let label = label.to_string();
    Handler::around(move |jp| {
        recorder.record(format!("{label}-pre"));
        jp.proceed()?;
        recorder.record(format!("{label}-post"));
        Ok(())
    })
}

/// `ClassA { foo }` and `ClassB: ClassA { bar, qux }`.
pub fn define_hierarchy(runtime: &AspectRuntime, recorder: &CallLog) {
    runtime
        .define_type(TypeBuilder::new("ClassA").method("foo", body(recorder, "foo")))
        .unwrap();
    runtime
        .define_type(
            TypeBuilder::new("ClassB")
                .extends("ClassA")
                .method("bar", body(recorder, "bar"))
                .method("qux", body(recorder, "qux")),
        )
        .unwrap();
}

pub fn instance(runtime: &AspectRuntime, type_name: &str) -> Receiver {
    runtime.instantiate(type_name, Map::new()).unwrap()
}
