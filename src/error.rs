//! Error types.
//!
//! Two kinds of failure flow through the crate:
//! - [`WeaveError`]: problems with the weaving setup itself (bad pointcuts,
//!   unknown types, flavor mismatches). Returned directly by registration and
//!   weaving APIs, and boxed into a [`BoxError`] when detected at call time.
//! - [`BoxError`]: whatever an advice handler or method body raised. It is
//!   passed back to the caller of a woven method as the same boxed value, so
//!   callers can downcast to the concrete error type they expect.

use crate::advice::Phase;

/// Opaque error raised by advice handlers, method bodies, and woven calls.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for weaving and registration operations.
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Errors that can occur while registering advice, defining types, or
/// dispatching a call.
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    #[error("Malformed pointcut: invalid {field} '{pattern}': {source}")]
    MalformedPointcut {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{phase} advice cannot use handler kind '{handler}'")]
    PhaseMismatch { phase: Phase, handler: &'static str },

    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Type '{0}' is already defined")]
    DuplicateType(String),

    #[error("Method '{method}' is declared twice on type '{type_name}'")]
    DuplicateMethod { type_name: String, method: String },

    #[error("Method '{method}' is not declared on type '{type_name}'")]
    MethodNotDeclared { type_name: String, method: String },

    #[error("Method '{method}' not found on '{type_name}' or its ancestors")]
    MethodNotFound { type_name: String, method: String },

    #[error("Method '{type_name}.{method}' is async; dispatch it with call_async")]
    AsyncMethod { type_name: String, method: String },

    #[error("Async advice matched synchronous method '{type_name}.{method}'")]
    AsyncAdviceOnSyncMethod { type_name: String, method: String },

    #[error("Synchronous around advice matched async method '{type_name}.{method}'")]
    SyncAroundOnAsyncMethod { type_name: String, method: String },

    #[error("Unknown pointcut '{0}'")]
    UnknownPointcut(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
