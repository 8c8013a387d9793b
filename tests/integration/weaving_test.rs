//! Class markers, inheritance and idempotent weaving.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use wove::{AspectRuntime, Handler, Method, Phase, PointcutSpec, TypeBuilder, WeaveConfig, WeaveError};

use crate::common::{body, define_hierarchy, instance, method_name_hook, recording_hook, CallLog};

fn logger_spec() -> PointcutSpec {
    PointcutSpec::methods(".*").with_classes("^ClassB|ClassA$")
}

#[test]
fn test_repeated_marking_runs_advice_once_per_call() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    define_hierarchy(&runtime, &bodies);
    runtime.before(&logger_spec(), method_name_hook(&methods)).unwrap();

    assert_eq!(runtime.apply_class_marker("ClassA").unwrap(), 1);
    assert_eq!(runtime.apply_class_marker("ClassA").unwrap(), 0);
    assert_eq!(runtime.apply_class_marker("ClassB").unwrap(), 2);

    let b = instance(&runtime, "ClassB");
    for method in ["foo", "bar", "qux"] {
        runtime.call(&b, method, vec![]).unwrap();
    }

    assert_eq!(methods.entries(), vec!["foo", "bar", "qux"]);
    assert_eq!(bodies.entries(), vec!["foo", "bar", "qux"]);
}

#[test]
fn test_marking_subclass_again_does_not_rewrap_ancestor() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    define_hierarchy(&runtime, &bodies);
    runtime.before(&logger_spec(), method_name_hook(&methods)).unwrap();

    for type_name in ["ClassA", "ClassB", "ClassA", "ClassB"] {
        runtime.apply_class_marker(type_name).unwrap();
    }
    runtime.call(&instance(&runtime, "ClassB"), "foo", vec![]).unwrap();

    assert_eq!(methods.count("foo"), 1);
    assert_eq!(bodies.count("foo"), 1);
}

#[test]
fn test_inherited_method_through_marked_subclass() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    runtime
        .define_type(TypeBuilder::new("Base").method("bar", body(&recorder, "bar")))
        .unwrap();
    runtime
        .define_type(TypeBuilder::new("Derived").extends("Base").method("own", body(&recorder, "own")))
        .unwrap();

    let seen_type = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_type);
    runtime
        .before(
            &PointcutSpec::methods("^bar$").with_classes("^Base$"),
            Handler::hook(move |meta| {
                *seen.lock() = Some(meta.type_name().to_string());
                Ok(())
            }),
        )
        .unwrap();

    runtime.apply_class_marker("Base").unwrap();
    runtime.apply_class_marker("Derived").unwrap();

    let derived = instance(&runtime, "Derived");
    let result = runtime.call(&derived, "bar", vec![]).unwrap();

    assert_eq!(result, Some(json!("bar")));
    assert_eq!(seen_type.lock().as_deref(), Some("Base"));
    assert_eq!(recorder.entries(), vec!["bar"]);
}

#[test]
fn test_inherited_method_of_unmarked_ancestor_runs_plain() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    define_hierarchy(&runtime, &bodies);
    runtime.before(&logger_spec(), method_name_hook(&methods)).unwrap();

    runtime.apply_class_marker("ClassB").unwrap();
    let b = instance(&runtime, "ClassB");
    runtime.call(&b, "foo", vec![]).unwrap();
    runtime.call(&b, "bar", vec![]).unwrap();

    assert_eq!(methods.entries(), vec!["bar"]);
    assert!(!runtime.is_woven("ClassA", "foo"));
}

#[test]
fn test_override_runs_nearest_declaration() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    define_hierarchy(&runtime, &bodies);
    runtime
        .define_type(
            TypeBuilder::new("ClassC")
                .extends("ClassB")
                .method("foo", body(&bodies, "ClassC.foo")),
        )
        .unwrap();
    runtime.before(&PointcutSpec::methods("^foo$"), method_name_hook(&methods)).unwrap();
    for type_name in ["ClassA", "ClassC"] {
        runtime.apply_class_marker(type_name).unwrap();
    }

    runtime.call(&instance(&runtime, "ClassC"), "foo", vec![]).unwrap();
    runtime.call(&instance(&runtime, "ClassA"), "foo", vec![]).unwrap();

    assert_eq!(bodies.entries(), vec!["ClassC.foo", "foo"]);
    assert_eq!(methods.entries(), vec!["foo", "foo"]);
}

#[test]
fn test_advice_registered_after_weaving_applies() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    define_hierarchy(&runtime, &recorder);
    runtime.apply_class_marker("ClassA").unwrap();
    let a = instance(&runtime, "ClassA");

    runtime.call(&a, "foo", vec![]).unwrap();
    runtime.before(&PointcutSpec::methods("foo"), recording_hook(&recorder, "late")).unwrap();
    runtime.call(&a, "foo", vec![]).unwrap();

    assert_eq!(recorder.entries(), vec!["foo", "late", "foo"]);
}

#[test]
fn test_advise_method_weaves_single_slot() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    define_hierarchy(&runtime, &recorder);

    runtime
        .advise_method("ClassB", "bar", Phase::Before, recording_hook(&recorder, "inline"))
        .unwrap();

    let b = instance(&runtime, "ClassB");
    runtime.call(&b, "bar", vec![]).unwrap();
    runtime.call(&b, "qux", vec![]).unwrap();

    assert!(runtime.is_woven("ClassB", "bar"));
    assert!(!runtime.is_woven("ClassB", "qux"));
    assert_eq!(recorder.entries(), vec!["inline", "bar", "qux"]);
}

#[test]
fn test_advise_method_requires_declared_method() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    define_hierarchy(&runtime, &recorder);

    let err = runtime
        .advise_method("ClassB", "foo", Phase::Before, recording_hook(&recorder, "inline"))
        .unwrap_err();

    assert!(matches!(err, WeaveError::MethodNotDeclared { .. }));
    assert!(runtime.registry().is_empty());
}

#[test]
fn test_concurrent_marking_wraps_once() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    define_hierarchy(&runtime, &bodies);
    runtime.before(&logger_spec(), method_name_hook(&methods)).unwrap();

    let woven: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| runtime.apply_class_marker("ClassB").unwrap()))
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).sum()
    });
    runtime.call(&instance(&runtime, "ClassB"), "bar", vec![]).unwrap();

    assert_eq!(woven, 2);
    assert_eq!(methods.entries(), vec!["bar"]);
}

#[test]
fn test_method_body_calls_through_receiver() {
    let runtime = AspectRuntime::new();
    let bodies = CallLog::new();
    let methods = CallLog::new();
    let nested = bodies.clone();
    runtime
        .define_type(
            TypeBuilder::new("ClassA")
                .method("foo", body(&bodies, "foo"))
                .method(
                    "bar",
                    Method::sync(move |this, _| {
                        nested.record("bar");
                        Ok(this.call("foo", vec![])?.unwrap_or_default())
                    }),
                ),
        )
        .unwrap();
    runtime.before(&PointcutSpec::classes("ClassA"), method_name_hook(&methods)).unwrap();
    runtime.apply_class_marker("ClassA").unwrap();

    let result = runtime.call(&instance(&runtime, "ClassA"), "bar", vec![]).unwrap();

    assert_eq!(result, Some(json!("foo")));
    assert_eq!(methods.entries(), vec!["bar", "foo"]);
    assert_eq!(bodies.entries(), vec!["bar", "foo"]);
}

#[test]
fn test_disabled_weaving_runs_no_advice() {
    let runtime = AspectRuntime::with_config(WeaveConfig {
        enabled: false,
        ..WeaveConfig::default()
    });
    let recorder = CallLog::new();
    define_hierarchy(&runtime, &recorder);
    runtime.before(&logger_spec(), recording_hook(&recorder, "before")).unwrap();

    assert_eq!(runtime.apply_class_marker("ClassA").unwrap(), 0);
    runtime.call(&instance(&runtime, "ClassA"), "foo", vec![]).unwrap();

    assert_eq!(recorder.entries(), vec!["foo"]);
}
