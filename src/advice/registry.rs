//! Append-only advice registry.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{AdviceEntry, Handler, Phase};
use crate::error::{Result, WeaveError};
use crate::pointcut::{Candidate, Pointcut, PointcutSpec};

/// Matching advice for one join point, split by phase, each in declaration
/// order.
#[derive(Debug, Default, Clone)]
pub struct AdvicePlan {
    pub before: Vec<Arc<AdviceEntry>>,
    pub around: Vec<Arc<AdviceEntry>>,
    pub after: Vec<Arc<AdviceEntry>>,
}

impl AdvicePlan {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.around.is_empty() && self.after.is_empty()
    }

    /// All entries, Before then Around then After.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<AdviceEntry>> {
        self.before.iter().chain(&self.around).chain(&self.after)
    }

    /// Reject plans that a synchronous method cannot run.
    pub(crate) fn ensure_sync(&self, type_name: &str, method: &str) -> Result<()> {
        if self.entries().any(|entry| entry.handler().is_async()) {
            return Err(WeaveError::AsyncAdviceOnSyncMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
            });
        }
        Ok(())
    }

    /// Reject plans that an async method cannot run.
    pub(crate) fn ensure_async(&self, type_name: &str, method: &str) -> Result<()> {
        if self
            .around
            .iter()
            .any(|entry| matches!(entry.handler(), Handler::Around(_)))
        {
            return Err(WeaveError::SyncAroundOnAsyncMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
            });
        }
        Ok(())
    }
}

/// Flat list of advice entries in registration order.
///
/// Entries are never removed individually; [`clear`](Self::clear) exists so a
/// runtime can be torn down between test cases.
#[derive(Debug, Default)]
pub struct AdviceRegistry {
    entries: RwLock<Vec<Arc<AdviceEntry>>>,
}

impl AdviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `spec` and append an entry. Returns the entry's declaration
    /// order.
    pub fn register(&self, phase: Phase, spec: &PointcutSpec, handler: Handler) -> Result<u64> {
        let mut entries = self.entries.write();
        let entry = AdviceEntry::new(phase, spec, handler, entries.len() as u64)?;
        Ok(push(&mut entries, entry))
    }

    /// Append an entry for an already compiled pointcut.
    pub fn register_pointcut(&self, phase: Phase, pointcut: Pointcut, handler: Handler) -> Result<u64> {
        let mut entries = self.entries.write();
        let entry = AdviceEntry::with_pointcut(phase, pointcut, handler, entries.len() as u64)?;
        Ok(push(&mut entries, entry))
    }

    /// Entries of `phase` whose pointcut matches, in declaration order.
    pub fn matching(&self, phase: Phase, candidate: &Candidate<'_>) -> Vec<Arc<AdviceEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.phase() == phase && entry.applies_to(candidate))
            .cloned()
            .collect()
    }

    /// Matching entries for all three phases in a single pass.
    pub fn plan(&self, candidate: &Candidate<'_>) -> AdvicePlan {
        let mut plan = AdvicePlan::default();
        for entry in self.entries.read().iter() {
            if !entry.applies_to(candidate) {
                continue;
            }
            let bucket = match entry.phase() {
                Phase::Before => &mut plan.before,
                Phase::Around => &mut plan.around,
                Phase::After => &mut plan.after,
            };
            bucket.push(Arc::clone(entry));
        }
        plan
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}

fn push(entries: &mut Vec<Arc<AdviceEntry>>, entry: AdviceEntry) -> u64 {
    let order = entry.order();
    debug!(
        phase = %entry.phase(),
        order,
        handler = entry.handler().kind(),
        "Registered advice"
    );
    entries.push(Arc::new(entry));
    order
}
