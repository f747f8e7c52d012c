//! # Specification Parsers
//!
//! Two front ends converge on one [`Api`]:
//!
//! - [`protobuf`] walks a serialized `FileDescriptorSet`
//! - [`openapi`] walks an OpenAPI v3 document
//!
//! Both pre-register the well-known types, apply the service configuration
//! overlays from [`service_config`], run [`crate::model::validate`] and either
//! return a complete model or fail. There is no partial model.

pub mod mixin;
pub mod openapi;
pub mod protobuf;
pub mod service_config;

#[cfg(test)]
mod tests;

use crate::model::{Api, Message, ModelError, PathInfo};
use crate::pathtemplate::{PathTemplate, PathTemplateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use service_config::ServiceConfig;

/// Input format of a generation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecificationFormat {
    #[serde(rename = "protobuf")]
    Protobuf,
    #[serde(rename = "openapi")]
    OpenApi,
}

impl FromStr for SpecificationFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "protobuf" => Ok(SpecificationFormat::Protobuf),
            "openapi" => Ok(SpecificationFormat::OpenApi),
            other => Err(ParseError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SpecificationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecificationFormat::Protobuf => write!(f, "protobuf"),
            SpecificationFormat::OpenApi => write!(f, "openapi"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported specification format {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor set {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },

    #[error("malformed OpenAPI document {path}: {message}")]
    OpenApi { path: PathBuf, message: String },

    #[error("malformed service config {path}: {source}")]
    ServiceConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required source option {0:?}")]
    MissingOption(String),

    #[error("{id}: {message}")]
    Malformed { id: String, message: String },

    #[error("{id} references unknown type {type_name}")]
    UnresolvedType { id: String, type_name: String },

    #[error("no local files match specification source {0:?}")]
    NoLocalFiles(String),

    #[error("{id} declares {found:?}, but this unit already has package {expected:?}")]
    InconsistentPackage {
        id: String,
        expected: String,
        found: String,
    },

    #[error("bad HTTP binding on {method}: {source}")]
    PathTemplate {
        method: String,
        #[source]
        source: PathTemplateError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Everything a front end needs for one generation unit.
#[derive(Debug, Clone)]
pub struct ParseRequest<'a> {
    pub format: SpecificationFormat,
    /// Descriptor file prefix (protobuf) or document path (openapi)
    pub specification_source: &'a str,
    pub service_config: Option<&'a ServiceConfig>,
    /// Free-form `[source]` options
    pub options: &'a BTreeMap<String, String>,
    /// Base for relative paths in `options` and `specification_source`
    pub project_root: &'a Path,
}

/// Parse and validate one generation unit.
pub fn parse(request: &ParseRequest<'_>) -> Result<Api, ParseError> {
    let api = parse_unvalidated(request)?;
    crate::model::validate(&api)?;
    Ok(api)
}

/// Run the front end for `request.format` without the final validation pass.
pub fn parse_unvalidated(request: &ParseRequest<'_>) -> Result<Api, ParseError> {
    match request.format {
        SpecificationFormat::Protobuf => protobuf::parse(request),
        SpecificationFormat::OpenApi => openapi::parse(request),
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, ParseError> {
    std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the [`PathInfo`] for a method bound to `path` with `verb`.
pub(crate) fn make_path_info(
    method_id: &str,
    verb: http::Method,
    path: &str,
    body: Option<&str>,
    input: &Message,
) -> Result<PathInfo, ParseError> {
    let template = PathTemplate::parse(path).map_err(|source| ParseError::PathTemplate {
        method: method_id.to_string(),
        source,
    })?;
    Ok(path_info(verb, template, body, input))
}

/// The query parameters are the input message's fields minus the first
/// component of every path variable and minus the body field. A `*` body
/// consumes every remaining field.
pub(crate) fn path_info(
    verb: http::Method,
    template: PathTemplate,
    body: Option<&str>,
    input: &Message,
) -> PathInfo {
    let body_field_path = body.filter(|b| !b.is_empty()).map(str::to_string);

    let query_parameters = if body_field_path.as_deref() == Some("*") {
        BTreeSet::new()
    } else {
        let consumed: BTreeSet<&str> = template
            .variables()
            .filter_map(|v| v.field_path.first().map(String::as_str))
            .chain(body_field_path.as_deref())
            .collect();
        input
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !consumed.contains(name))
            .map(str::to_string)
            .collect()
    };

    PathInfo {
        verb,
        template,
        body_field_path,
        query_parameters,
    }
}

/// Fail if a local entity claims a package other than the one already seen.
pub(crate) fn check_package(
    package: &mut Option<String>,
    id: &str,
    found: &str,
) -> Result<(), ParseError> {
    if let Some(expected) = package.as_deref() {
        if expected != found {
            return Err(ParseError::InconsistentPackage {
                id: id.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        return Ok(());
    }
    *package = Some(found.to_string());
    Ok(())
}
