//! Weaver: installs intercepting replacements into method-table slots.
//!
//! A slot goes `Unwoven -> Woven` at most once. Callers hold the type table's
//! write lock across [`Weaver::weave`], so the check and the install are one
//! step and two concurrent weaves of the same slot cannot both wrap it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::advice::AdviceRegistry;
use crate::error::{Result, WeaveError};
use crate::invocation::{woven_async, woven_sync, CallSite};
use crate::marker::MarkerQuery;
use crate::method::Method;
use crate::types::{TypeHandle, TypeTable};

/// Wraps method slots so their calls run the advice protocol.
#[derive(Clone)]
pub struct Weaver {
    registry: Arc<AdviceRegistry>,
    markers: Arc<dyn MarkerQuery>,
    trace_calls: bool,
}

impl Weaver {
    pub fn new(registry: Arc<AdviceRegistry>, markers: Arc<dyn MarkerQuery>, trace_calls: bool) -> Self {
        Self {
            registry,
            markers,
            trace_calls,
        }
    }

    /// Weave the slot `method` declared directly on `handle`.
    ///
    /// Returns `Ok(false)` when the slot was already woven.
    pub fn weave(&self, table: &mut TypeTable, handle: TypeHandle, method: &str) -> Result<bool> {
        let type_name = table
            .get(handle)
            .map(|ty| ty.name().to_string())
            .ok_or_else(|| WeaveError::UnknownType(format!("{handle:?}")))?;

        let slot = table
            .slot_mut(handle, method)
            .ok_or_else(|| WeaveError::MethodNotDeclared {
                type_name: type_name.clone(),
                method: method.to_string(),
            })?;

        if slot.is_woven() {
            debug!(%type_name, method, "Method already woven");
            return Ok(false);
        }

        let site = Arc::new(CallSite::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.markers),
            slot.declaring_type(),
            slot.name(),
            self.trace_calls,
        ));
        let replacement = match slot.entry() {
            Method::Sync(body) => Method::Sync(woven_sync(site, Arc::clone(body))),
            Method::Async(body) => Method::Async(woven_async(site, Arc::clone(body))),
        };
        let flavor = replacement.flavor();
        slot.install(replacement);

        info!(%type_name, method, flavor, "Woven method");
        Ok(true)
    }

    /// Weave every method declared directly on `handle`, in declaration
    /// order. Returns how many slots were newly woven.
    pub fn weave_type(&self, table: &mut TypeTable, handle: TypeHandle) -> Result<usize> {
        let methods: Vec<String> = table
            .get(handle)
            .ok_or_else(|| WeaveError::UnknownType(format!("{handle:?}")))?
            .methods()
            .iter()
            .map(|slot| slot.name().to_string())
            .collect();

        let mut woven = 0;
        for method in &methods {
            if self.weave(table, handle, method)? {
                woven += 1;
            }
        }
        Ok(woven)
    }
}

impl std::fmt::Debug for Weaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Weaver")
            .field("registry", &self.registry)
            .field("trace_calls", &self.trace_calls)
            .finish()
    }
}
