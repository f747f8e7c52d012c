//! # clientgen
//!
//! **clientgen** turns an API definition into an idiomatic client library.
//! Input is either a serialized protobuf `FileDescriptorSet` (with
//! `google.api.http` annotations) or an OpenAPI v3 document, optionally
//! overlaid with a service configuration YAML.
//!
//! ## Pipeline
//!
//! ```text
//! .clientgen.toml ─► parser ─► model::validate ─► codec::annotate ─► render ─► files
//! ```
//!
//! - **[`pathtemplate`]** - the HTTP path template grammar (`/v1/{name=projects/*}:verb`)
//! - **[`parser`]** - protobuf and OpenAPI front ends producing one [`model::Api`]
//! - **[`model`]** - the language-neutral API graph and its validation
//! - **[`codec`]** - target-language naming, types, path access and docs
//! - **[`render`]** - `minijinja` templates over the annotated model
//! - **[`config`]** - per-directory TOML configuration with root defaults
//! - **[`refresh`]** - one directory, or all of them on a `may` worker pool
//! - **[`cli`]** - the `clientgen` binary
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ## Example
//!
//! ```rust,ignore
//! use clientgen::refresh::{refresh_all, RefreshPoolConfig};
//! use std::path::Path;
//!
//! let reports = refresh_all(Path::new("."), false, &RefreshPoolConfig::from_env())?;
//! for report in reports {
//!     println!("{} ({} files)", report.directory.display(), report.files.len());
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod logging;
pub mod model;
pub mod parser;
pub mod pathtemplate;
pub mod refresh;
pub mod render;

pub use codec::{Codec, Language};
pub use config::Config;
pub use model::Api;
pub use parser::{parse, ParseRequest, SpecificationFormat};
