//! Aspects: named bundles of advice.
//!
//! An aspect is installed into one [`AspectRuntime`], where it registers its
//! advice. Aspects can be installed explicitly with
//! [`AspectRuntime::install`], or submitted at link time and picked up by
//! [`AspectRuntime::install_collected_aspects`]:
//!
//! ```ignore
//! fn install_audit(runtime: &AspectRuntime) -> wove::Result<()> {
//!     runtime.before(&PointcutSpec::marked(["audit"]), Handler::hook(|meta| {
//!         tracing::info!(method = meta.method_name(), "audited call");
//!         Ok(())
//!     }))?;
//!     Ok(())
//! }
//!
//! inventory::submit! { AspectRegistration::new("audit", install_audit) }
//! ```

use crate::error::Result;
use crate::runtime::AspectRuntime;

/// A named group of advice registrations.
pub trait Aspect: Send + Sync {
    fn name(&self) -> &str;

    /// Register this aspect's advice (and weave whatever it needs woven).
    fn install(&self, runtime: &AspectRuntime) -> Result<()>;
}

/// Link-time registration of an aspect.
#[derive(Debug)]
pub struct AspectRegistration {
    pub name: &'static str,
    pub install: fn(&AspectRuntime) -> Result<()>,
}

impl AspectRegistration {
    pub const fn new(name: &'static str, install: fn(&AspectRuntime) -> Result<()>) -> Self {
        Self { name, install }
    }
}

impl Aspect for AspectRegistration {
    fn name(&self) -> &str {
        self.name
    }

    fn install(&self, runtime: &AspectRuntime) -> Result<()> {
        (self.install)(runtime)
    }
}

inventory::collect!(AspectRegistration);

/// All submitted aspect registrations, sorted by name.
pub fn collected_aspects() -> Vec<&'static AspectRegistration> {
    let mut aspects: Vec<&'static AspectRegistration> =
        inventory::iter::<AspectRegistration>.into_iter().collect();
    aspects.sort_by_key(|aspect| aspect.name);
    aspects
}
