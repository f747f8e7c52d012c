//! Template rendering.
//!
//! Every `*.j2` file below the template root is rendered once against the
//! annotated model. The output path is the template's path relative to the
//! root with the `.j2` suffix removed. Files without the suffix are ignored.
//!
//! Rendering and writing are separate steps so a dry run can render without
//! touching the output directory.
//!
//! Templates see four variables: `api` (the whole model, including `state`),
//! and the local `messages`, `enums` and `services` in generation order.

use crate::model::Api;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::json;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const TEMPLATE_SUFFIX: &str = ".j2";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template directory {0} does not exist")]
    MissingTemplateDir(PathBuf),

    #[error("cannot walk template directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("cannot serialize the model: {0}")]
    Context(#[from] serde_json::Error),

    #[error("output path {0} escapes the output directory")]
    UnsafePath(PathBuf),

    #[error(transparent)]
    Model(#[from] crate::model::ModelError),
}

/// One rendered file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Relative to the output root
    pub path: PathBuf,
    pub contents: String,
}

/// Template sources keyed by their `/`-separated path below `root`, sorted.
fn collect_templates(root: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !root.is_dir() {
        return Err(RenderError::MissingTemplateDir(root.to_path_buf()));
    }
    let mut templates = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !name.ends_with(TEMPLATE_SUFFIX) {
            continue;
        }
        let source = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        templates.push((name, source));
    }
    Ok(templates)
}

/// Render every template below `template_root` against `api`.
pub fn render(api: &Api, template_root: &Path) -> Result<Vec<RenderedFile>, RenderError> {
    let templates = collect_templates(template_root)?;

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    for (name, source) in &templates {
        env.add_template(name, source)
            .map_err(|source| RenderError::Template {
                name: name.clone(),
                source,
            })?;
    }

    let ctx = json!({
        "api": serde_json::to_value(api)?,
        "messages": serde_json::to_value(api.local_messages()?)?,
        "enums": serde_json::to_value(api.local_enums()?)?,
        "services": serde_json::to_value(api.local_services()?)?,
    });

    let mut files = Vec::with_capacity(templates.len());
    for (name, _) in &templates {
        let tmpl = env.get_template(name).map_err(|source| RenderError::Template {
            name: name.clone(),
            source,
        })?;
        let contents = tmpl.render(&ctx).map_err(|source| RenderError::Template {
            name: name.clone(),
            source,
        })?;
        let path = PathBuf::from(name.trim_end_matches(TEMPLATE_SUFFIX));
        debug!(template = %name, output = %path.display(), bytes = contents.len(), "template rendered");
        files.push(RenderedFile { path, contents });
    }
    Ok(files)
}

/// Join `relative` onto `root`, refusing anything but plain components.
fn output_path(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for comp in relative.components() {
        match comp {
            Component::Normal(s) => out.push(s),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Write rendered files below `output_root`, creating directories as needed.
pub fn write_files(output_root: &Path, files: &[RenderedFile]) -> Result<(), RenderError> {
    for file in files {
        let path = output_path(output_root, &file.path)
            .ok_or_else(|| RenderError::UnsafePath(file.path.clone()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &file.contents).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
    }
    info!(output = %output_root.display(), files = files.len(), "files written");
    Ok(())
}
