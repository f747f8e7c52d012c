//! Per-directory generation configuration.
//!
//! Each generated directory carries a `.clientgen.toml`. The same file at the
//! project root supplies defaults: every `[general]` key the directory leaves
//! out is inherited, and `[source]` / `[codec]` are merged key by key with the
//! directory winning.
//!
//! ```toml
//! [general]
//! language = "rust"
//! specification-format = "protobuf"
//! specification-source = "google/cloud/secretmanager/v1"
//! service-config = "google/cloud/secretmanager/v1/secretmanager_v1.yaml"
//!
//! [source]
//! descriptor-set = "protos.binpb"
//!
//! [codec]
//! package-name-override = "secretmanager"
//! ```

#[cfg(test)]
mod tests;

use crate::codec::Language;
use crate::parser::SpecificationFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of both the root defaults and the per-directory configuration.
pub const CONFIG_FILE: &str = ".clientgen.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration does not set general.{0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_format: Option<SpecificationFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    /// Options for the specification parser
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source: BTreeMap<String, String>,
    /// Options for the codec
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub codec: BTreeMap<String, String>,
}

/// A merged configuration with every required key present and paths
/// resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub language: Language,
    pub specification_format: SpecificationFormat,
    pub specification_source: String,
    pub service_config: Option<PathBuf>,
    pub template_dir: PathBuf,
    pub source: BTreeMap<String, String>,
    pub codec: BTreeMap<String, String>,
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load the configuration at `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Load `dir/.clientgen.toml`.
    pub fn load_dir(dir: &Path) -> Result<Option<Self>, ConfigError> {
        Self::load(&dir.join(CONFIG_FILE))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `self` (a directory configuration) over `defaults`.
    pub fn merged_over(&self, defaults: &Config) -> Config {
        let general = GeneralConfig {
            language: self.general.language.or(defaults.general.language),
            specification_format: self
                .general
                .specification_format
                .or(defaults.general.specification_format),
            specification_source: self
                .general
                .specification_source
                .clone()
                .or_else(|| defaults.general.specification_source.clone()),
            service_config: self
                .general
                .service_config
                .clone()
                .or_else(|| defaults.general.service_config.clone()),
            template_dir: self
                .general
                .template_dir
                .clone()
                .or_else(|| defaults.general.template_dir.clone()),
        };
        let merge = |base: &BTreeMap<String, String>, over: &BTreeMap<String, String>| {
            let mut out = base.clone();
            out.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
            out
        };
        Config {
            general,
            source: merge(&defaults.source, &self.source),
            codec: merge(&defaults.codec, &self.codec),
        }
    }

    /// Check required keys and resolve paths against `project_root`.
    ///
    /// Without `template-dir` the templates are read from
    /// `<project_root>/templates/<language>`.
    pub fn resolve(&self, project_root: &Path) -> Result<ResolvedConfig, ConfigError> {
        let general = &self.general;
        let language = general.language.ok_or(ConfigError::Missing("language"))?;
        let template_dir = match &general.template_dir {
            Some(dir) => project_root.join(dir),
            None => project_root.join("templates").join(language.to_string()),
        };
        Ok(ResolvedConfig {
            language,
            specification_format: general
                .specification_format
                .ok_or(ConfigError::Missing("specification-format"))?,
            specification_source: general
                .specification_source
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("specification-source"))?,
            service_config: general.service_config.as_ref().map(|p| project_root.join(p)),
            template_dir,
            source: self.source.clone(),
            codec: self.codec.clone(),
        })
    }
}
