//! Service configuration overlay.
//!
//! A YAML side-channel document naming the service, listing the mixin APIs it
//! exposes, and overriding documentation and HTTP bindings by selector.
//!
//! ```yaml
//! name: secretmanager.googleapis.com
//! title: Secret Manager API
//! apis:
//!   - name: google.cloud.secretmanager.v1.SecretManagerService
//!   - name: google.cloud.location.Locations
//! documentation:
//!   summary: Stores sensitive data such as API keys.
//!   rules:
//!     - selector: google.cloud.location.Locations.ListLocations
//!       description: Lists information about the supported locations.
//! http:
//!   rules:
//!     - selector: google.cloud.location.Locations.ListLocations
//!       get: '/v1/{name=projects/*}/locations'
//! ```

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub apis: Vec<ApiEntry>,
    #[serde(default)]
    pub documentation: Documentation,
    #[serde(default)]
    pub http: Http,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEntry {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub rules: Vec<DocumentationRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRule {
    pub selector: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Http {
    #[serde(default)]
    pub rules: Vec<HttpRule>,
}

/// One `google.api.HttpRule`-shaped binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRule {
    #[serde(default)]
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpRule {
    /// The verb and path of this rule, if it has one.
    pub fn binding(&self) -> Option<(http::Method, &str)> {
        [
            (http::Method::GET, &self.get),
            (http::Method::PUT, &self.put),
            (http::Method::POST, &self.post),
            (http::Method::DELETE, &self.delete),
            (http::Method::PATCH, &self.patch),
        ]
        .into_iter()
        .find_map(|(verb, path)| path.as_deref().map(|p| (verb, p)))
    }
}

impl ServiceConfig {
    /// Read a service config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ParseError::ServiceConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// True if `api` (e.g. `google.cloud.location.Locations`) is listed.
    pub fn has_api(&self, api: &str) -> bool {
        self.apis.iter().any(|a| a.name == api)
    }

    /// Documentation override for an entity id, with or without leading dot.
    pub fn documentation_for(&self, id: &str) -> Option<&str> {
        let selector = id.trim_start_matches('.');
        self.documentation
            .rules
            .iter()
            .find(|r| r.selector == selector)
            .map(|r| r.description.as_str())
    }

    /// HTTP binding override (verb, path, body) for a method id, with or
    /// without leading dot. Rules without a verb are ignored.
    pub fn http_binding_for(&self, id: &str) -> Option<(http::Method, &str, Option<&str>)> {
        let selector = id.trim_start_matches('.');
        self.http
            .rules
            .iter()
            .filter(|r| r.selector == selector)
            .find_map(|r| {
                r.binding()
                    .map(|(verb, path)| (verb, path, r.body.as_deref()))
            })
    }
}
