//! Type table: per-type method tables with single-inheritance resolution.
//!
//! Every type owns the method slots it declares directly. Dispatch resolves a
//! method name by walking the ancestry (the type itself first, then each
//! parent), so a subclass that does not override a method runs the nearest
//! ancestor's slot, woven or not.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, WeaveError};
use crate::marker::MarkerId;
use crate::method::Method;

/// Index of a type in its [`TypeTable`].
///
/// A handle is bound to the table generation that issued it; once the table
/// is cleared, older handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    index: usize,
    generation: u64,
}

/// Weaving state of one method slot.
///
/// `Unwoven -> Woven` is the only transition; a woven slot is never rewoven.
#[derive(Debug, Clone, Default)]
pub enum WeavingState {
    /// The slot still holds the declared method.
    #[default]
    Unwoven,
    /// The slot holds an intercepting replacement; `original` is the method
    /// it wraps.
    Woven { original: Method },
}

impl WeavingState {
    pub fn is_woven(&self) -> bool {
        matches!(self, WeavingState::Woven { .. })
    }
}

/// One entry of a type's method table.
#[derive(Debug, Clone)]
pub struct MethodSlot {
    name: String,
    declaring_type: String,
    entry: Method,
    state: WeavingState,
}

impl MethodSlot {
    fn new(name: String, declaring_type: String, entry: Method) -> Self {
        Self {
            name,
            declaring_type,
            entry,
            state: WeavingState::Unwoven,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type that declares this slot.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// The method currently installed (the woven replacement once woven).
    pub fn entry(&self) -> &Method {
        &self.entry
    }

    pub fn state(&self) -> &WeavingState {
        &self.state
    }

    pub fn is_woven(&self) -> bool {
        self.state.is_woven()
    }

    /// Swap in a woven replacement, remembering the original.
    pub(crate) fn install(&mut self, replacement: Method) {
        let original = std::mem::replace(&mut self.entry, replacement);
        self.state = WeavingState::Woven { original };
    }
}

/// A defined type: its name, parent, and directly declared methods.
#[derive(Debug)]
pub struct TypeDef {
    handle: TypeHandle,
    name: String,
    parent: Option<TypeHandle>,
    methods: Vec<MethodSlot>,
}

impl TypeDef {
    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<TypeHandle> {
        self.parent
    }

    /// Directly declared methods, in declaration order.
    pub fn methods(&self) -> &[MethodSlot] {
        &self.methods
    }

    /// Directly declared slot for `method`.
    pub fn slot(&self, method: &str) -> Option<&MethodSlot> {
        self.methods.iter().find(|slot| slot.name == method)
    }

    fn slot_mut(&mut self, method: &str) -> Option<&mut MethodSlot> {
        self.methods.iter_mut().find(|slot| slot.name == method)
    }
}

/// A marker to attach while a type is being defined.
#[derive(Debug, Clone)]
pub struct MarkerAttachment {
    pub method: String,
    pub marker: MarkerId,
    pub payload: Option<Value>,
    /// Weave the method as soon as the type is defined.
    pub weave: bool,
}

/// Builder for a type definition.
///
/// # Example
///
/// ```ignore
/// let service = TypeBuilder::new("Service")
///     .extends("BaseService")
///     .method("load", Method::sync(|this, _| Ok(this.get("cached").unwrap_or_default())))
///     .marker("load", "cache", Some(json!({ "key": "load" })));
/// runtime.define_type(service)?;
/// ```
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    name: String,
    parent: Option<String>,
    methods: Vec<(String, Method)>,
    markers: Vec<MarkerAttachment>,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            methods: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Inherit from an already defined type.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare a method directly on this type.
    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.push((name.into(), method));
        self
    }

    /// Attach a marker to one of this type's methods.
    pub fn marker(
        mut self,
        method: impl Into<String>,
        marker: impl Into<MarkerId>,
        payload: Option<Value>,
    ) -> Self {
        self.markers.push(MarkerAttachment {
            method: method.into(),
            marker: marker.into(),
            payload,
            weave: false,
        });
        self
    }

    /// Attach a marker and weave the method when the type is defined, so
    /// marker-mode advice applies without marking the whole type.
    pub fn weaving_marker(
        mut self,
        method: impl Into<String>,
        marker: impl Into<MarkerId>,
        payload: Option<Value>,
    ) -> Self {
        self.markers.push(MarkerAttachment {
            method: method.into(),
            marker: marker.into(),
            payload,
            weave: true,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (TypeParts, Vec<MarkerAttachment>) {
        (
            TypeParts {
                name: self.name,
                parent: self.parent,
                methods: self.methods,
            },
            self.markers,
        )
    }
}

/// The table-owned part of a [`TypeBuilder`].
pub(crate) struct TypeParts {
    name: String,
    parent: Option<String>,
    methods: Vec<(String, Method)>,
}

impl TypeParts {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn declares(&self, method: &str) -> bool {
        self.methods.iter().any(|(name, _)| name == method)
    }
}

/// All defined types.
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeHandle>,
    generation: u64,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define(&mut self, parts: TypeParts) -> Result<TypeHandle> {
        if self.by_name.contains_key(&parts.name) {
            return Err(WeaveError::DuplicateType(parts.name));
        }

        let parent = match parts.parent {
            Some(parent) => Some(
                self.lookup(&parent)
                    .ok_or(WeaveError::UnknownType(parent))?,
            ),
            None => None,
        };

        let mut methods: Vec<MethodSlot> = Vec::with_capacity(parts.methods.len());
        for (name, method) in parts.methods {
            if methods.iter().any(|slot| slot.name == name) {
                return Err(WeaveError::DuplicateMethod {
                    type_name: parts.name,
                    method: name,
                });
            }
            methods.push(MethodSlot::new(name, parts.name.clone(), method));
        }

        let handle = TypeHandle {
            index: self.types.len(),
            generation: self.generation,
        };
        self.by_name.insert(parts.name.clone(), handle);
        self.types.push(TypeDef {
            handle,
            name: parts.name,
            parent,
            methods,
        });
        Ok(handle)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).copied()
    }

    /// Type definition for a handle issued by this table.
    pub fn get(&self, handle: TypeHandle) -> Option<&TypeDef> {
        if handle.generation != self.generation {
            return None;
        }
        self.types.get(handle.index)
    }

    /// The type followed by its ancestors, nearest first.
    pub fn ancestry(&self, handle: TypeHandle) -> Ancestry<'_> {
        Ancestry {
            table: self,
            next: Some(handle),
        }
    }

    /// Nearest slot for `method`, searching the type and then its ancestors.
    pub fn resolve(&self, handle: TypeHandle, method: &str) -> Option<&MethodSlot> {
        self.ancestry(handle).find_map(|ty| ty.slot(method))
    }

    pub(crate) fn slot_mut(&mut self, handle: TypeHandle, method: &str) -> Option<&mut MethodSlot> {
        if handle.generation != self.generation {
            return None;
        }
        self.types.get_mut(handle.index)?.slot_mut(method)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.types.clear();
        self.by_name.clear();
        self.generation += 1;
    }
}

/// Iterator over a type and its ancestors.
pub struct Ancestry<'a> {
    table: &'a TypeTable,
    next: Option<TypeHandle>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a TypeDef;

    fn next(&mut self) -> Option<Self::Item> {
        let ty = self.table.get(self.next?)?;
        self.next = ty.parent;
        Some(ty)
    }
}
