//! # Path Template Module
//!
//! Parses HTTP routing annotations such as
//! `/v1/{name=projects/*/secrets/*}:getIamPolicy` into an ordered sequence of
//! [`PathSegment`]s.
//!
//! ## Grammar
//!
//! ```text
//! Template     = "/" Segments [ Verb ]
//! Segments     = Segment { "/" Segment }
//! Segment      = Variable | PlainSegment
//! PlainSegment = "*" | "**" | LITERAL
//! Variable     = "{" FieldPath [ "=" PlainSegments ] "}"
//! FieldPath    = IDENT { "." IDENT }
//! Verb         = ":" LITERAL
//! ```
//!
//! `LITERAL` is limited to URL unreserved characters plus percent-encoded
//! octets, `IDENT` is `[A-Za-z][A-Za-z0-9_]*`. A variable without `=` binds a
//! single `*` segment.
//!
//! Parsing never panics: every malformed template yields a
//! [`PathTemplateError`] carrying the byte offset of the offending token.
//! Top-level wildcards are kept as literal `*` / `**` segments so that
//! [`PathTemplate`]'s `Display` output re-parses to the identical structure.

mod parser;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use parser::parse;

/// Single-segment wildcard.
pub const WILDCARD: &str = "*";
/// Multi-segment wildcard.
pub const MULTI_WILDCARD: &str = "**";

/// A position-anchored syntax error in a path template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path template {template:?} at position {position}: {message}")]
pub struct PathTemplateError {
    /// The full template that failed to parse
    pub template: String,
    /// Byte offset of the offending token
    pub position: usize,
    /// What was expected or found
    pub message: String,
}

/// The structured form of an HTTP routing annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathTemplate {
    /// Segments in order; a verb, if any, is always last.
    pub segments: Vec<PathSegment>,
}

/// One element of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    /// Literal text, including the top-level `*` and `**` wildcards
    Literal(String),
    /// A `{field.path=...}` binding
    Variable(PathVariable),
    /// The trailing `:verb`
    Verb(String),
}

/// A variable binding a request field to one or more path segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathVariable {
    /// Components of the bound field path, e.g. `["secret", "name"]`
    pub field_path: Vec<String>,
    /// Plain segments matched by the variable, `["*"]` when implicit
    pub segments: Vec<String>,
}

impl PathVariable {
    /// A variable with the implicit single-segment match.
    pub fn new<S: AsRef<str>>(field_path: &[S]) -> Self {
        Self {
            field_path: field_path.iter().map(|s| s.as_ref().to_string()).collect(),
            segments: vec![WILDCARD.to_string()],
        }
    }

    /// Replace the matched segments, e.g. `["projects", "*", "secrets", "*"]`.
    pub fn with_segments<S: AsRef<str>>(mut self, segments: &[S]) -> Self {
        self.segments = segments.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// The dotted field path (`secret.name`).
    pub fn field_name(&self) -> String {
        self.field_path.join(".")
    }

    fn is_implicit(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == WILDCARD
    }
}

impl PathTemplate {
    /// Parse a routing annotation.
    pub fn parse(template: &str) -> Result<Self, PathTemplateError> {
        parser::parse(template)
    }

    /// All variables in path order.
    pub fn variables(&self) -> impl Iterator<Item = &PathVariable> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Variable(v) => Some(v),
            _ => None,
        })
    }

    /// The trailing custom verb, if present.
    pub fn verb(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Verb(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Rewrite every variable's field path component with `f`.
    ///
    /// Used by front ends whose routing annotations name fields by their wire
    /// name rather than the canonical field name.
    pub fn map_field_paths<F: Fn(&str) -> String>(mut self, f: F) -> Self {
        for segment in &mut self.segments {
            if let PathSegment::Variable(var) = segment {
                for component in &mut var.field_path {
                    *component = f(component);
                }
            }
        }
        self
    }
}

impl FromStr for PathTemplate {
    type Err = PathTemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(lit) => write!(f, "/{lit}")?,
                PathSegment::Variable(var) => write!(f, "/{var}")?,
                PathSegment::Verb(verb) => write!(f, ":{verb}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for PathVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit() {
            write!(f, "{{{}}}", self.field_name())
        } else {
            write!(f, "{{{}={}}}", self.field_name(), self.segments.join("/"))
        }
    }
}
