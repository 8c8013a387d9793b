//! Aspect installation, explicit and link-time collected.

use serde_json::json;
use wove::{Aspect, AspectRegistration, AspectRuntime, Handler, PointcutSpec, TypeBuilder};

use crate::common::{echo, instance, recording_around, recording_hook, CallLog};

/// Aspect that audits every method of `Account` and weaves it itself.
struct AuditAspect {
    recorder: CallLog,
}

impl Aspect for AuditAspect {
    fn name(&self) -> &str {
        "audit"
    }

    fn install(&self, runtime: &AspectRuntime) -> wove::Result<()> {
        let spec = PointcutSpec::classes("^Account$");
        runtime.before(&spec, recording_hook(&self.recorder, "audit.before"))?;
        runtime.around(&spec, recording_around(&self.recorder, "audit.around"))?;
        runtime.after(&spec, recording_hook(&self.recorder, "audit.after"))?;
        runtime.apply_class_marker("Account")?;
        Ok(())
    }
}

#[test]
fn test_install_aspect() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    runtime
        .define_type(TypeBuilder::new("Account").method("deposit", echo(&recorder, "deposit")))
        .unwrap();

    runtime
        .install(&AuditAspect {
            recorder: recorder.clone(),
        })
        .unwrap();
    let result = runtime
        .call(&instance(&runtime, "Account"), "deposit", vec![json!(10)])
        .unwrap();

    assert_eq!(runtime.registry().len(), 3);
    assert_eq!(result, Some(json!([10])));
    assert_eq!(
        recorder.entries(),
        vec![
            "audit.before",
            "audit.around-pre",
            "deposit",
            "audit.around-post",
            "audit.after"
        ]
    );
}

#[test]
fn test_install_fails_for_missing_target() {
    let runtime = AspectRuntime::new();

    let err = runtime
        .install(&AuditAspect {
            recorder: CallLog::new(),
        })
        .unwrap_err();

    assert!(matches!(err, wove::WeaveError::UnknownType(name) if name == "Account"));
}

/// Appends `tag` to the arguments of `Collected.tags`.
fn tagging(runtime: &AspectRuntime, tag: &'static str) -> wove::Result<()> {
    runtime.before(
        &PointcutSpec::methods("^tags$").with_classes("^Collected$"),
        Handler::hook(move |meta| {
            meta.args.push(json!(tag));
            Ok(())
        }),
    )?;
    Ok(())
}

fn install_beta(runtime: &AspectRuntime) -> wove::Result<()> {
    tagging(runtime, "beta")
}

fn install_alpha(runtime: &AspectRuntime) -> wove::Result<()> {
    tagging(runtime, "alpha")
}

wove::inventory::submit! { AspectRegistration::new("tags-beta", install_beta) }
wove::inventory::submit! { AspectRegistration::new("tags-alpha", install_alpha) }

#[test]
fn test_collected_aspects_install_in_name_order() {
    let runtime = AspectRuntime::new();
    let recorder = CallLog::new();
    runtime
        .define_type(TypeBuilder::new("Collected").method("tags", echo(&recorder, "tags")))
        .unwrap();
    runtime.apply_class_marker("Collected").unwrap();

    let installed = runtime.install_collected_aspects().unwrap();
    let result = runtime
        .call(&instance(&runtime, "Collected"), "tags", vec![])
        .unwrap();

    assert_eq!(installed, 2);
    assert_eq!(result, Some(json!(["alpha", "beta"])));
}
