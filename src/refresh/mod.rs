//! # Refresh
//!
//! Regenerates one directory from its `.clientgen.toml`. A unit moves through
//! `Loaded → Parsed → Validated → Rendered → Done` and stops at the first
//! failing step; [`RefreshError`] names the directory and the step.
//!
//! A dry run executes every step up to and including rendering, in memory,
//! and skips only the final write.
//!
//! [`pool`] runs many units concurrently and aggregates their failures.

pub mod pool;


use crate::codec::{self, codec_for};
use crate::config::{Config, CONFIG_FILE};
use crate::model;
use crate::parser::{self, ParseRequest, ServiceConfig};
use crate::render;
use anyhow::{anyhow, Context};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub use pool::{discover_directories, refresh_all, refresh_directories, RefreshAllError, RefreshPoolConfig};

/// Progress of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Loaded,
    Parsed,
    Validated,
    Rendered,
    Done,
}

/// The step a unit failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Parse,
    Validate,
    Render,
    Write,
    /// The worker running the unit panicked
    Worker,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Parse => "parse",
            Stage::Validate => "validate",
            Stage::Render => "render",
            Stage::Write => "write",
            Stage::Worker => "worker",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{}: {stage} failed: {error:#}", directory.display())]
pub struct RefreshError {
    pub directory: PathBuf,
    pub stage: Stage,
    pub error: anyhow::Error,
}

/// Outcome of a successful unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub directory: PathBuf,
    pub state: UnitState,
    /// Rendered files, relative to `directory`
    pub files: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Root defaults from `project_root/.clientgen.toml`, empty if absent.
pub fn load_defaults(project_root: &Path) -> anyhow::Result<Config> {
    let defaults = Config::load_dir(project_root).with_context(|| {
        format!(
            "failed to load root configuration in {}",
            project_root.display()
        )
    })?;
    Ok(defaults.unwrap_or_default())
}

/// Regenerate `directory` from its own configuration layered over the
/// project root defaults.
pub fn refresh(project_root: &Path, directory: &Path, dry_run: bool) -> Result<RefreshReport, RefreshError> {
    let defaults = load_defaults(project_root).map_err(|error| RefreshError {
        directory: directory.to_path_buf(),
        stage: Stage::Load,
        error,
    })?;
    refresh_with_defaults(&defaults, project_root, directory, dry_run)
}

/// Like [`refresh`] with the root defaults already loaded.
pub fn refresh_with_defaults(
    defaults: &Config,
    project_root: &Path,
    directory: &Path,
    dry_run: bool,
) -> Result<RefreshReport, RefreshError> {
    let local = Config::load_dir(directory)
        .map_err(anyhow::Error::from)
        .and_then(|config| {
            config.ok_or_else(|| anyhow!("no {CONFIG_FILE} in {}", directory.display()))
        })
        .map_err(|error| RefreshError {
            directory: directory.to_path_buf(),
            stage: Stage::Load,
            error,
        })?;
    run_unit(defaults, &local, project_root, directory, dry_run)
}

/// Generate into a new or existing `output` directory from `local`, then
/// write `local` as the directory's configuration so later refreshes
/// reproduce the run.
pub fn generate(
    defaults: &Config,
    local: &Config,
    project_root: &Path,
    output: &Path,
    dry_run: bool,
) -> Result<RefreshReport, RefreshError> {
    run_unit(defaults, local, project_root, output, dry_run)
}

fn run_unit(
    defaults: &Config,
    local: &Config,
    project_root: &Path,
    directory: &Path,
    dry_run: bool,
) -> Result<RefreshReport, RefreshError> {
    let mut state = UnitState::Pending;
    let result = run_stages(defaults, local, project_root, directory, dry_run, &mut state);
    match result {
        Ok(files) => {
            info!(
                directory = %directory.display(),
                files = files.len(),
                dry_run,
                "refresh complete"
            );
            Ok(RefreshReport {
                directory: directory.to_path_buf(),
                state,
                files,
                dry_run,
            })
        }
        Err((stage, error)) => {
            error!(
                directory = %directory.display(),
                stage = %stage,
                reached = ?state,
                error = %format!("{error:#}"),
                "refresh failed"
            );
            Err(RefreshError {
                directory: directory.to_path_buf(),
                stage,
                error,
            })
        }
    }
}

fn advance(state: &mut UnitState, next: UnitState, directory: &Path) {
    debug!(directory = %directory.display(), from = ?*state, to = ?next, "unit state");
    *state = next;
}

fn run_stages(
    defaults: &Config,
    local: &Config,
    project_root: &Path,
    directory: &Path,
    dry_run: bool,
    state: &mut UnitState,
) -> Result<Vec<PathBuf>, (Stage, anyhow::Error)> {
    let fail = |stage: Stage| move |error: anyhow::Error| (stage, error);

    let merged = local.merged_over(defaults);
    let resolved = merged.resolve(project_root).map_err(|e| fail(Stage::Load)(e.into()))?;
    let service_config = resolved
        .service_config
        .as_deref()
        .map(ServiceConfig::load)
        .transpose()
        .map_err(|e| fail(Stage::Load)(e.into()))?;
    advance(state, UnitState::Loaded, directory);

    let request = ParseRequest {
        format: resolved.specification_format,
        specification_source: &resolved.specification_source,
        service_config: service_config.as_ref(),
        options: &resolved.source,
        project_root,
    };
    let mut api = parser::parse_unvalidated(&request).map_err(|e| fail(Stage::Parse)(e.into()))?;
    advance(state, UnitState::Parsed, directory);

    model::validate(&api).map_err(|e| fail(Stage::Validate)(e.into()))?;
    advance(state, UnitState::Validated, directory);

    let codec = codec_for(resolved.language, &resolved.codec, &api)
        .map_err(|e| fail(Stage::Render)(e.into()))?;
    codec::annotate(codec.as_ref(), &mut api).map_err(|e| fail(Stage::Render)(e.into()))?;
    let files = render::render(&api, &resolved.template_dir)
        .map_err(|e| fail(Stage::Render)(e.into()))?;
    advance(state, UnitState::Rendered, directory);

    if !dry_run {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("failed to create {}", directory.display()))
            .map_err(fail(Stage::Write))?;
        render::write_files(directory, &files).map_err(|e| fail(Stage::Write)(e.into()))?;
        local
            .save(&directory.join(CONFIG_FILE))
            .map_err(|e| fail(Stage::Write)(e.into()))?;
    }
    advance(state, UnitState::Done, directory);

    Ok(files.into_iter().map(|f| f.path).collect())
}
