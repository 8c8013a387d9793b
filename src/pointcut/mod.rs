//! Pointcuts: declarative selection of join points.
//!
//! A [`PointcutSpec`] is plain data (it can come from code or from YAML
//! configuration). Registering advice compiles it into a [`Pointcut`], which is
//! where malformed patterns are reported. Matching is a pure predicate over a
//! [`Candidate`].
//!
//! # Matching modes
//!
//! - **Pattern mode**: `method_name_pattern` and `class_name_pattern` are
//!   regular expressions searched (unanchored) in the method name and the
//!   declaring type name. Every present pattern must match; an absent pattern
//!   places no constraint.
//! - **Marker mode**: when `markers` is present the pattern fields are ignored
//!   and the join point matches if it carries any listed marker.
//!
//! A pointcut with nothing set matches nothing.

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, WeaveError};
use crate::marker::MarkerId;


/// Declarative pointcut description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PointcutSpec {
    /// Regex the method name must match.
    pub method_name_pattern: Option<String>,
    /// Regex the declaring type name must match.
    pub class_name_pattern: Option<String>,
    /// Marker identities; any one of them selects the join point.
    pub markers: Option<Vec<MarkerId>>,
}

impl PointcutSpec {
    /// Select methods whose name matches `pattern`.
    pub fn methods(pattern: impl Into<String>) -> Self {
        Self {
            method_name_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Select methods of types whose name matches `pattern`.
    pub fn classes(pattern: impl Into<String>) -> Self {
        Self {
            class_name_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Select methods carrying any of `markers`.
    pub fn marked<I, M>(markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MarkerId>,
    {
        Self {
            markers: Some(markers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Add a method name constraint.
    pub fn with_methods(mut self, pattern: impl Into<String>) -> Self {
        self.method_name_pattern = Some(pattern.into());
        self
    }

    /// Add a declaring type constraint.
    pub fn with_classes(mut self, pattern: impl Into<String>) -> Self {
        self.class_name_pattern = Some(pattern.into());
        self
    }

    /// Whether no selection field is set.
    pub fn is_empty(&self) -> bool {
        self.method_name_pattern.is_none()
            && self.class_name_pattern.is_none()
            && self.markers.is_none()
    }
}

/// What the matcher sees of a join point.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub method_name: &'a str,
    /// Name of the type that declares the method.
    pub type_name: &'a str,
    pub markers: &'a [MarkerId],
}

/// Compiled pointcut.
#[derive(Debug, Clone)]
pub struct Pointcut {
    mode: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    Nothing,
    Pattern {
        method: Option<Regex>,
        class: Option<Regex>,
    },
    Markers(Vec<MarkerId>),
}

impl Pointcut {
    /// Compile a spec, rejecting invalid patterns.
    pub fn compile(spec: &PointcutSpec) -> Result<Self> {
        let method = compile_pattern("method_name_pattern", spec.method_name_pattern.as_deref())?;
        let class = compile_pattern("class_name_pattern", spec.class_name_pattern.as_deref())?;

        if let Some(markers) = &spec.markers {
            if method.is_some() || class.is_some() {
                warn!(
                    markers = ?markers,
                    "Pointcut sets both markers and name patterns; marker mode applies and patterns are ignored"
                );
            }
            return Ok(Self {
                mode: Mode::Markers(markers.clone()),
            });
        }

        let mode = if method.is_none() && class.is_none() {
            Mode::Nothing
        } else {
            Mode::Pattern { method, class }
        };

        Ok(Self { mode })
    }

    /// Pointcut selecting exactly `type_name.method`.
    pub fn exact(type_name: &str, method: &str) -> Result<Self> {
        let method_pattern = format!("^{}$", regex::escape(method));
        let class_pattern = format!("^{}$", regex::escape(type_name));
        Ok(Self {
            mode: Mode::Pattern {
                method: compile_pattern("method_name_pattern", Some(&method_pattern))?,
                class: compile_pattern("class_name_pattern", Some(&class_pattern))?,
            },
        })
    }

    pub fn matches(&self, candidate: &Candidate<'_>) -> bool {
        match &self.mode {
            Mode::Nothing => false,
            Mode::Pattern { method, class } => {
                method
                    .as_ref()
                    .map_or(true, |re| re.is_match(candidate.method_name))
                    && class
                        .as_ref()
                        .map_or(true, |re| re.is_match(candidate.type_name))
            }
            Mode::Markers(wanted) => candidate.markers.iter().any(|id| wanted.contains(id)),
        }
    }

    /// Whether this pointcut selects by marker.
    pub fn is_marker_mode(&self) -> bool {
        matches!(self.mode, Mode::Markers(_))
    }
}

fn compile_pattern(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| WeaveError::MalformedPointcut {
                field,
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()
}
