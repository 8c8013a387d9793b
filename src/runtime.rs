//! Aspect runtime: the scoped context that owns all weaving state.
//!
//! One [`AspectRuntime`] holds the advice registry, the marker side-table, the
//! type table and the configuration. Nothing is process-global except the
//! link-time aspect list, so tests build a fresh runtime (or [`reset`] one)
//! per case.
//!
//! [`reset`]: AspectRuntime::reset

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::advice::{AdviceRegistry, Handler, Phase};
use crate::aspect::{collected_aspects, Aspect};
use crate::config::WeaveConfig;
use crate::error::{Result, WeaveError};
use crate::marker::{MarkerId, MarkerQuery, MarkerTable};
use crate::method::CallResult;
use crate::object::{Object, Receiver};
use crate::pointcut::{Pointcut, PointcutSpec};
use crate::types::{TypeBuilder, TypeHandle, TypeTable};
use crate::weaver::Weaver;

/// Registry, markers and types for one weaving context.
#[derive(Debug)]
pub struct AspectRuntime {
    config: WeaveConfig,
    registry: Arc<AdviceRegistry>,
    markers: Arc<MarkerTable>,
    types: Arc<RwLock<TypeTable>>,
    weaver: Weaver,
}

impl Default for AspectRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AspectRuntime {
    /// Runtime with default configuration.
    pub fn new() -> Self {
        Self::with_config(WeaveConfig::default())
    }

    pub fn with_config(config: WeaveConfig) -> Self {
        let registry = Arc::new(AdviceRegistry::new());
        let markers = Arc::new(MarkerTable::new());
        let weaver = Weaver::new(
            Arc::clone(&registry),
            Arc::clone(&markers) as Arc<dyn MarkerQuery>,
            config.trace_calls,
        );

        Self {
            config,
            registry,
            markers,
            types: Arc::new(RwLock::new(TypeTable::new())),
            weaver,
        }
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdviceRegistry {
        &self.registry
    }

    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    /// Register advice for every join point `spec` selects.
    pub fn register_advice(&self, phase: Phase, spec: &PointcutSpec, handler: Handler) -> Result<u64> {
        self.registry.register(phase, spec, handler)
    }

    pub fn before(&self, spec: &PointcutSpec, handler: Handler) -> Result<u64> {
        self.register_advice(Phase::Before, spec, handler)
    }

    pub fn around(&self, spec: &PointcutSpec, handler: Handler) -> Result<u64> {
        self.register_advice(Phase::Around, spec, handler)
    }

    pub fn after(&self, spec: &PointcutSpec, handler: Handler) -> Result<u64> {
        self.register_advice(Phase::After, spec, handler)
    }

    /// Register advice against a pointcut named in the configuration.
    pub fn register_named(&self, phase: Phase, name: &str, handler: Handler) -> Result<u64> {
        let spec = self.config.pointcut(name)?;
        self.registry.register(phase, spec, handler)
    }

    /// Advise exactly `type_name.method` and weave that slot.
    pub fn advise_method(
        &self,
        type_name: &str,
        method: &str,
        phase: Phase,
        handler: Handler,
    ) -> Result<u64> {
        let pointcut = Pointcut::exact(type_name, method)?;
        self.weave_method(type_name, method)?;
        self.registry.register_pointcut(phase, pointcut, handler)
    }

    /// Define a type, attach its markers, and weave methods that carry a
    /// weaving marker.
    pub fn define_type(&self, builder: TypeBuilder) -> Result<TypeHandle> {
        let (parts, markers) = builder.into_parts();
        if let Some(undeclared) = markers.iter().find(|marker| !parts.declares(&marker.method)) {
            return Err(WeaveError::MethodNotDeclared {
                type_name: parts.name().to_string(),
                method: undeclared.method.clone(),
            });
        }

        let mut types = self.types.write();
        let handle = types.define(parts)?;
        let (type_name, method_count) = match types.get(handle) {
            Some(ty) => (ty.name().to_string(), ty.methods().len()),
            None => return Err(WeaveError::UnknownType(format!("{handle:?}"))),
        };

        for attachment in &markers {
            self.markers.attach(
                &type_name,
                &attachment.method,
                &attachment.marker,
                attachment.payload.clone(),
            );
        }

        if self.config.enabled {
            for attachment in markers.iter().filter(|marker| marker.weave) {
                self.weaver.weave(&mut types, handle, &attachment.method)?;
            }
        }

        info!(%type_name, methods = method_count, markers = markers.len(), "Defined type");
        Ok(handle)
    }

    /// Mark a type: weave every method it declares directly.
    ///
    /// Returns how many slots were newly woven; marking again returns 0.
    pub fn apply_class_marker(&self, type_name: &str) -> Result<usize> {
        let mut types = self.types.write();
        let handle = types
            .lookup(type_name)
            .ok_or_else(|| WeaveError::UnknownType(type_name.to_string()))?;

        if !self.config.enabled {
            debug!(type_name, "Weaving disabled, class marker ignored");
            return Ok(0);
        }

        let woven = self.weaver.weave_type(&mut types, handle)?;
        info!(type_name, woven, "Applied class marker");
        Ok(woven)
    }

    /// Weave one method declared directly on `type_name`.
    pub fn weave_method(&self, type_name: &str, method: &str) -> Result<bool> {
        let mut types = self.types.write();
        let handle = types
            .lookup(type_name)
            .ok_or_else(|| WeaveError::UnknownType(type_name.to_string()))?;

        if !self.config.enabled {
            debug!(type_name, method, "Weaving disabled, method left unwoven");
            return Ok(false);
        }

        self.weaver.weave(&mut types, handle, method)
    }

    /// Whether the slot `method` declared on `type_name` is woven.
    pub fn is_woven(&self, type_name: &str, method: &str) -> bool {
        let types = self.types.read();
        types
            .lookup(type_name)
            .and_then(|handle| types.get(handle))
            .and_then(|ty| ty.slot(method))
            .is_some_and(|slot| slot.is_woven())
    }

    pub fn get_marker(&self, marker: &MarkerId, type_name: &str, method: &str) -> Option<Value> {
        self.markers.get_marker(marker, type_name, method)
    }

    /// Create an instance of a defined type.
    pub fn instantiate(&self, type_name: &str, fields: Map<String, Value>) -> Result<Receiver> {
        let handle = self
            .types
            .read()
            .lookup(type_name)
            .ok_or_else(|| WeaveError::UnknownType(type_name.to_string()))?;

        Ok(Object::new(
            handle,
            type_name.to_string(),
            fields,
            Arc::clone(&self.types),
        ))
    }

    pub fn call(&self, receiver: &Receiver, method: &str, args: Vec<Value>) -> CallResult {
        receiver.call(method, args)
    }

    pub async fn call_async(&self, receiver: &Receiver, method: &str, args: Vec<Value>) -> CallResult {
        receiver.call_async(method, args).await
    }

    pub fn install(&self, aspect: &dyn Aspect) -> Result<()> {
        let before = self.registry.len();
        aspect.install(self)?;
        info!(
            aspect = aspect.name(),
            advice = self.registry.len().saturating_sub(before),
            "Installed aspect"
        );
        Ok(())
    }

    /// Install every link-time submitted aspect, in name order.
    pub fn install_collected_aspects(&self) -> Result<usize> {
        let aspects = collected_aspects();
        for aspect in &aspects {
            self.install(*aspect)?;
        }
        Ok(aspects.len())
    }

    /// Drop all advice, markers and types.
    pub fn reset(&self) {
        self.registry.clear();
        self.markers.clear();
        self.types.write().clear();
        debug!("Aspect runtime reset");
    }
}
