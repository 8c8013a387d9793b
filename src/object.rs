//! Receiver objects and method dispatch.
//!
//! An [`Object`] is an instance of a type defined in the runtime's
//! [`TypeTable`]. It keeps a handle on that table (its "class pointer"), so a
//! method body holding the receiver can dispatch sibling calls the same way an
//! external caller does.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BoxError, WeaveError};
use crate::method::{CallResult, Method};
use crate::types::{TypeHandle, TypeTable};

/// Shared handle on a receiver instance.
pub type Receiver = Arc<Object>;

/// Instance of a runtime-defined type.
pub struct Object {
    id: Uuid,
    class: TypeHandle,
    type_name: String,
    fields: RwLock<Map<String, Value>>,
    table: Arc<RwLock<TypeTable>>,
}

impl Object {
    pub(crate) fn new(
        class: TypeHandle,
        type_name: String,
        fields: Map<String, Value>,
        table: Arc<RwLock<TypeTable>>,
    ) -> Receiver {
        Arc::new(Self {
            id: Uuid::new_v4(),
            class,
            type_name,
            fields: RwLock::new(fields),
            table,
        })
    }

    /// Unique instance id (used in trace spans).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Concrete type handle.
    pub fn class(&self) -> TypeHandle {
        self.class
    }

    /// Concrete type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.read().get(field).cloned()
    }

    /// Write a field, returning the previous value.
    pub fn set(&self, field: &str, value: Value) -> Option<Value> {
        self.fields.write().insert(field.to_string(), value)
    }

    /// Call a synchronous method, resolved through the type's ancestry.
    ///
    /// Errors raised by advice or by the method body come back unchanged.
    /// Dispatch problems (unknown method, async method) are boxed
    /// [`WeaveError`]s.
    pub fn call(self: &Arc<Self>, method: &str, args: Vec<Value>) -> CallResult {
        match self.resolve(method)? {
            Method::Sync(body) => body(self, args),
            Method::Async(_) => Err(WeaveError::AsyncMethod {
                type_name: self.type_name.clone(),
                method: method.to_string(),
            }
            .into()),
        }
    }

    /// Call a method of either flavor and await its result.
    pub async fn call_async(self: &Arc<Self>, method: &str, args: Vec<Value>) -> CallResult {
        match self.resolve(method)? {
            Method::Sync(body) => body(self, args),
            Method::Async(body) => body(Arc::clone(self), args).await,
        }
    }

    /// Look up the nearest method-table entry for `method`.
    ///
    /// The table lock is released before the entry runs, so method bodies and
    /// advice are free to dispatch further calls or trigger weaving.
    fn resolve(&self, method: &str) -> std::result::Result<Method, BoxError> {
        let table = self.table.read();
        if table.get(self.class).is_none() {
            return Err(WeaveError::UnknownType(self.type_name.clone()).into());
        }
        table
            .resolve(self.class, method)
            .map(|slot| slot.entry().clone())
            .ok_or_else(|| {
                WeaveError::MethodNotFound {
                    type_name: self.type_name.clone(),
                    method: method.to_string(),
                }
                .into()
            })
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("fields", &*self.fields.read())
            .finish()
    }
}
