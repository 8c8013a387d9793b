//! Wove - runtime aspect weaving
//!
//! Independently authored aspects attach Before, Around and After advice to
//! methods of runtime-defined types, selected by name patterns or markers.
//! Weaving replaces a method-table slot once; every later call of that slot
//! runs the matched advice in a deterministic order.
//!
//! ```ignore
//! let runtime = AspectRuntime::new();
//! runtime.define_type(
//!     TypeBuilder::new("ClassA").method("foo", Method::sync(|_, _| Ok(json!("foo")))),
//! )?;
//! runtime.before(&PointcutSpec::classes("^ClassA$"), Handler::hook(|meta| {
//!     tracing::info!(method = meta.method_name(), "calling");
//!     Ok(())
//! }))?;
//! runtime.apply_class_marker("ClassA")?;
//!
//! let a = runtime.instantiate("ClassA", Map::new())?;
//! runtime.call(&a, "foo", vec![])?;
//! ```

pub mod advice;
pub mod aspect;
pub mod config;
pub mod error;
mod invocation;
pub mod joinpoint;
pub mod marker;
pub mod method;
pub mod object;
pub mod pointcut;
pub mod runtime;
pub mod types;
pub mod utils;
pub mod weaver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advice::{AdviceEntry, AdvicePlan, AdviceRegistry, Handler, Phase};
pub use aspect::{Aspect, AspectRegistration};
pub use config::WeaveConfig;
pub use error::{BoxError, Result, WeaveError};
pub use joinpoint::{AsyncJoinPoint, JoinPoint, Metadata};
pub use marker::{MarkerId, MarkerQuery, MarkerTable};
pub use method::{CallResult, Method};
pub use object::{Object, Receiver};
pub use pointcut::{Candidate, Pointcut, PointcutSpec};
pub use runtime::AspectRuntime;
pub use types::{TypeBuilder, TypeHandle, WeavingState};
pub use weaver::Weaver;

// Re-exported so `inventory::submit!` works for downstream aspects without a
// direct dependency.
pub use inventory;
