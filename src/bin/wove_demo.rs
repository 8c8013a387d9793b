//! wove-demo: aspect weaving walkthrough
//!
//! Defines a small service hierarchy, installs a logging aspect (Before and
//! After on every service method) and a caching aspect (Around on methods
//! marked `cache`), then calls the woven methods synchronously and
//! asynchronously. Everything the aspects do is reported through tracing.
//!
//! ## Configuration
//! - WOVE_LOG: tracing filter (default: info)
//! - WOVE_CONFIG: optional YAML config path; `WOVE__*` env vars override it
//!
//! A named pointcut `services` in the config replaces the built-in service
//! selector.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::info;

use wove::utils::bootstrap::init_tracing;
use wove::{
    Aspect, AspectRuntime, Handler, MarkerId, Method, Phase, PointcutSpec, TypeBuilder, WeaveConfig,
};

const SERVICES: &str = "services";

/// Logs entry and exit of every selected method.
struct LoggingAspect;

impl Aspect for LoggingAspect {
    fn name(&self) -> &str {
        "logging"
    }

    fn install(&self, runtime: &AspectRuntime) -> wove::Result<()> {
        let before = Handler::hook(|meta| {
            info!(type_name = meta.type_name(), method = meta.method_name(), args = ?meta.args, "enter");
            Ok(())
        });
        let after = Handler::hook(|meta| {
            info!(type_name = meta.type_name(), method = meta.method_name(), result = ?meta.result, "exit");
            Ok(())
        });

        if runtime.config().pointcut(SERVICES).is_ok() {
            runtime.register_named(Phase::Before, SERVICES, before)?;
            runtime.register_named(Phase::After, SERVICES, after)?;
        } else {
            let services = PointcutSpec::classes("Service$");
            runtime.before(&services, before)?;
            runtime.after(&services, after)?;
        }
        Ok(())
    }
}

/// Memoizes results of methods marked `cache` (sync) or `async_cache`, keyed
/// by the marker's `key` payload and the call arguments.
#[derive(Default)]
struct CachingAspect {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl Aspect for CachingAspect {
    fn name(&self) -> &str {
        "caching"
    }

    fn install(&self, runtime: &AspectRuntime) -> wove::Result<()> {
        let cache = MarkerId::new("cache");
        let async_cache = MarkerId::new("async_cache");

        let entries = Arc::clone(&self.entries);
        let marker = cache.clone();
        runtime.around(
            &PointcutSpec::marked([&cache]),
            Handler::around(move |jp| {
                let key = cache_key(jp.marker(&marker), &jp.args);
                let cached = entries.lock().get(&key).cloned();
                if let Some(hit) = cached {
                    info!(%key, "cache hit");
                    jp.set_result(hit);
                    return Ok(());
                }
                let value = jp.proceed()?.unwrap_or_default();
                info!(%key, "cache miss");
                entries.lock().insert(key, value);
                Ok(())
            }),
        )?;

        let entries = Arc::clone(&self.entries);
        let marker = async_cache.clone();
        runtime.around(
            &PointcutSpec::marked([&async_cache]),
            Handler::async_around(move |jp| {
                let entries = Arc::clone(&entries);
                let key = cache_key(jp.marker(&marker), &jp.args);
                Box::pin(async move {
                    let cached = entries.lock().get(&key).cloned();
                    if let Some(hit) = cached {
                        info!(%key, "cache hit");
                        jp.set_result(hit);
                        return Ok(());
                    }
                    let value = jp.proceed().await?.unwrap_or_default();
                    info!(%key, "cache miss");
                    entries.lock().insert(key, value);
                    Ok(())
                })
            }),
        )?;
        Ok(())
    }
}

fn cache_key(payload: Option<Value>, args: &[Value]) -> String {
    let prefix = payload
        .as_ref()
        .and_then(|payload| payload.get("key"))
        .and_then(Value::as_str)
        .unwrap_or("anonymous");
    format!("{prefix}:{}", Value::Array(args.to_vec()))
}

fn define_types(runtime: &AspectRuntime) -> wove::Result<()> {
    runtime.define_type(
        TypeBuilder::new("BaseService").method(
            "describe",
            Method::sync(|this, _| Ok(json!(format!("instance of {}", this.type_name())))),
        ),
    )?;
    runtime.define_type(
        TypeBuilder::new("PriceService")
            .extends("BaseService")
            .method(
                "quote",
                Method::sync(|this, args| {
                    let qty = args.first().and_then(Value::as_f64).unwrap_or(1.0);
                    let unit = this.get("unit_price").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Ok(json!(qty * unit))
                }),
            )
            .method(
                "quote_remote",
                Method::asynchronous(|this, args| async move {
                    tokio::task::yield_now().await;
                    let qty = args.first().and_then(Value::as_f64).unwrap_or(1.0);
                    let unit = this.get("unit_price").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Ok(json!({ "total": qty * unit, "source": "remote" }))
                }),
            )
            .marker("quote", "cache", Some(json!({ "key": "quote" })))
            .marker("quote_remote", "async_cache", Some(json!({ "key": "quote_remote" }))),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), wove::BoxError> {
    init_tracing();

    let config = WeaveConfig::load(None)?;
    let runtime = AspectRuntime::with_config(config);

    define_types(&runtime)?;
    runtime.install(&LoggingAspect)?;
    runtime.install(&CachingAspect::default())?;

    let woven = runtime.apply_class_marker("BaseService")? + runtime.apply_class_marker("PriceService")?;
    info!(woven, "Class markers applied");

    let mut fields = Map::new();
    fields.insert("unit_price".to_string(), json!(2.5));
    let prices = runtime.instantiate("PriceService", fields)?;

    let description = runtime.call(&prices, "describe", vec![])?;
    info!(?description, "describe");

    for _ in 0..2 {
        let quote = runtime.call(&prices, "quote", vec![json!(4)])?;
        info!(?quote, "quote");
    }

    for _ in 0..2 {
        let quote = runtime.call_async(&prices, "quote_remote", vec![json!(3)]).await?;
        info!(?quote, "quote_remote");
    }

    Ok(())
}
