//! Method markers: static tags with an optional payload.
//!
//! Markers live in a side-table keyed by `(type name, method name)`. They are
//! attached when a type is defined and only ever read by the weaving core,
//! through the [`MarkerQuery`] seam: marker-mode pointcuts ask which markers a
//! join point carries, and handlers look up payloads via
//! [`Metadata::marker`](crate::joinpoint::Metadata::marker).

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;

/// Identity of a marker kind (e.g. `"log"`, `"cache"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MarkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&MarkerId> for MarkerId {
    fn from(id: &MarkerId) -> Self {
        id.clone()
    }
}

/// Read-only view of method markers used by the weaving core.
pub trait MarkerQuery: Send + Sync {
    /// Payload of `marker` on `type_name.method`, if the marker is attached.
    /// A marker attached without a payload yields `Value::Null`.
    fn get_marker(&self, marker: &MarkerId, type_name: &str, method: &str) -> Option<Value>;

    /// All markers attached to `type_name.method`, in attachment order.
    fn markers_on(&self, type_name: &str, method: &str) -> Vec<MarkerId>;
}

/// A marker attached to one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub payload: Value,
}

/// In-memory marker side-table.
#[derive(Debug, Default)]
pub struct MarkerTable {
    entries: RwLock<HashMap<(String, String), Vec<MarkerRecord>>>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `marker` to `type_name.method`.
    ///
    /// Attaching the same marker again replaces its payload.
    pub fn attach(
        &self,
        type_name: &str,
        method: &str,
        marker: impl Into<MarkerId>,
        payload: Option<Value>,
    ) {
        let record = MarkerRecord {
            id: marker.into(),
            payload: payload.unwrap_or(Value::Null),
        };

        let mut entries = self.entries.write();
        let records = entries
            .entry((type_name.to_string(), method.to_string()))
            .or_default();
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => existing.payload = record.payload,
            None => records.push(record),
        }
    }

    /// Whether any marker is attached to `type_name.method`.
    pub fn is_marked(&self, type_name: &str, method: &str) -> bool {
        self.entries
            .read()
            .get(&(type_name.to_string(), method.to_string()))
            .is_some_and(|records| !records.is_empty())
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}

impl MarkerQuery for MarkerTable {
    fn get_marker(&self, marker: &MarkerId, type_name: &str, method: &str) -> Option<Value> {
        self.entries
            .read()
            .get(&(type_name.to_string(), method.to_string()))?
            .iter()
            .find(|record| &record.id == marker)
            .map(|record| record.payload.clone())
    }

    fn markers_on(&self, type_name: &str, method: &str) -> Vec<MarkerId> {
        self.entries
            .read()
            .get(&(type_name.to_string(), method.to_string()))
            .map(|records| records.iter().map(|record| record.id.clone()).collect())
            .unwrap_or_default()
    }
}
