//! Configuration-driven weaving and registration errors.

use wove::{AspectRuntime, Handler, Phase, PointcutSpec, TypeBuilder, WeaveConfig, WeaveError};

use crate::common::{body, instance, method_name_hook, recording_hook, CallLog};

const CONFIG: &str = r#"
trace_calls: true
pointcuts:
  services:
    class_name_pattern: "Service$"
  logged:
    markers: [log]
  broken:
    method_name_pattern: "(unclosed"
"#;

fn runtime() -> AspectRuntime {
    AspectRuntime::with_config(WeaveConfig::from_yaml_str(CONFIG).unwrap())
}

#[test]
fn test_named_pointcuts_from_yaml() {
    let runtime = runtime();
    let recorder = CallLog::new();
    runtime
        .define_type(
            TypeBuilder::new("OrderService")
                .method("place", body(&recorder, "place"))
                .method("cancel", body(&recorder, "cancel")),
        )
        .unwrap();
    runtime
        .define_type(
            TypeBuilder::new("Ledger")
                .method("post", body(&recorder, "post"))
                .method("read", body(&recorder, "read"))
                .weaving_marker("post", "log", None),
        )
        .unwrap();
    runtime.apply_class_marker("OrderService").unwrap();

    runtime
        .register_named(Phase::Before, "services", method_name_hook(&recorder))
        .unwrap();
    runtime
        .register_named(Phase::After, "logged", recording_hook(&recorder, "logged"))
        .unwrap();

    let service = instance(&runtime, "OrderService");
    runtime.call(&service, "place", vec![]).unwrap();
    let ledger = instance(&runtime, "Ledger");
    runtime.call(&ledger, "post", vec![]).unwrap();
    runtime.call(&ledger, "read", vec![]).unwrap();

    assert!(runtime.config().trace_calls);
    assert_eq!(
        recorder.entries(),
        vec!["place", "place", "post", "logged", "read"]
    );
}

#[test]
fn test_unknown_named_pointcut() {
    let runtime = runtime();

    let err = runtime
        .register_named(Phase::Before, "nowhere", Handler::hook(|_| Ok(())))
        .unwrap_err();

    assert!(matches!(err, WeaveError::UnknownPointcut(name) if name == "nowhere"));
    assert!(runtime.registry().is_empty());
}

#[test]
fn test_malformed_named_pointcut_rejected_at_registration() {
    let runtime = runtime();

    let err = runtime
        .register_named(Phase::Before, "broken", Handler::hook(|_| Ok(())))
        .unwrap_err();

    assert!(matches!(err, WeaveError::MalformedPointcut { field: "method_name_pattern", .. }));
    assert!(runtime.registry().is_empty());
}

#[test]
fn test_malformed_pattern_rejected_at_registration() {
    let runtime = AspectRuntime::new();

    let err = runtime
        .before(&PointcutSpec::classes("Class["), Handler::hook(|_| Ok(())))
        .unwrap_err();

    assert!(matches!(err, WeaveError::MalformedPointcut { field: "class_name_pattern", .. }));
    assert!(err.to_string().contains("Class["));
}

#[test]
fn test_handler_must_fit_phase() {
    let runtime = AspectRuntime::new();

    let err = runtime
        .register_advice(
            Phase::After,
            &PointcutSpec::methods("foo"),
            Handler::around(|jp| jp.proceed().map(|_| ())),
        )
        .unwrap_err();

    assert_eq!(err.to_string(), "after advice cannot use handler kind 'around'");
}

#[test]
fn test_empty_pointcut_matches_nothing() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    runtime
        .define_type(TypeBuilder::new("ClassA").method("foo", body(&recorder, "foo")))
        .unwrap();
    runtime.apply_class_marker("ClassA").unwrap();

    runtime
        .before(&PointcutSpec::default(), recording_hook(&recorder, "never"))
        .unwrap();
    runtime
        .before(&PointcutSpec::marked(Vec::<&str>::new()), recording_hook(&recorder, "never"))
        .unwrap();
    runtime.call(&instance(&runtime, "ClassA"), "foo", vec![]).unwrap();

    assert_eq!(recorder.entries(), vec!["foo"]);
}
