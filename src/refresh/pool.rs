//! # Refresh-All Worker Pool
//!
//! Runs one refresh per configured directory on a pool of `may` coroutines.
//! Workers share a job channel and report on a fan-in channel; the
//! coordinator waits for every unit and then reports all failures together.
//!
//! ## Configuration
//!
//! - `CLIENTGEN_REFRESH_WORKERS`: number of worker coroutines (default: 4)
//! - `CLIENTGEN_REFRESH_STACK_SIZE`: coroutine stack size, decimal or `0x` hex
//!   (default: 2MB)

use super::{load_defaults, refresh_with_defaults, RefreshError, RefreshReport, Stage};
use crate::config::{Config, CONFIG_FILE};
use anyhow::{anyhow, Context};
use may::sync::mpsc;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_STACK_SIZE: usize = 0x20_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPoolConfig {
    pub num_workers: usize,
    pub stack_size: usize,
}

impl RefreshPoolConfig {
    pub fn from_env() -> Self {
        let num_workers = std::env::var("CLIENTGEN_REFRESH_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WORKERS);
        let stack_size = std::env::var("CLIENTGEN_REFRESH_STACK_SIZE")
            .ok()
            .and_then(|s| match s.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            })
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self {
            num_workers: num_workers.max(1),
            stack_size,
        }
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }
}

impl Default for RefreshPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_WORKERS,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Every failing unit of a refresh-all run.
#[derive(Debug)]
pub struct RefreshAllError {
    pub failures: Vec<RefreshError>,
    pub succeeded: usize,
}

impl fmt::Display for RefreshAllError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} directories failed",
            self.failures.len(),
            self.failures.len() + self.succeeded
        )?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RefreshAllError {}

/// Directories below `project_root` that carry a `.clientgen.toml`, sorted.
///
/// The root's own file holds defaults and is not a unit. Hidden directories
/// and `target` are skipped.
pub fn discover_directories(project_root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(project_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with('.') || name == "target")
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", project_root.display()))?;
        if entry.depth() > 1 && entry.file_type().is_file() && entry.file_name() == CONFIG_FILE {
            if let Some(parent) = entry.path().parent() {
                dirs.push(parent.to_path_buf());
            }
        }
    }
    debug!(root = %project_root.display(), count = dirs.len(), "directories discovered");
    Ok(dirs)
}

/// Discover and refresh every configured directory below `project_root`.
pub fn refresh_all(
    project_root: &Path,
    dry_run: bool,
    pool: &RefreshPoolConfig,
) -> anyhow::Result<Vec<RefreshReport>> {
    let defaults = load_defaults(project_root)?;
    let dirs = discover_directories(project_root)?;
    if dirs.is_empty() {
        warn!(root = %project_root.display(), "no configured directories found");
        return Ok(Vec::new());
    }
    Ok(refresh_directories(
        Arc::new(defaults),
        project_root,
        dirs,
        dry_run,
        pool,
    )?)
}

type Job = (usize, PathBuf);
type Outcome = (usize, Result<RefreshReport, RefreshError>);

/// Refresh `dirs` concurrently; fails with every per-unit error if any unit
/// fails. Reports come back in the order of `dirs`.
#[allow(unsafe_code)]
pub fn refresh_directories(
    defaults: Arc<Config>,
    project_root: &Path,
    dirs: Vec<PathBuf>,
    dry_run: bool,
    pool: &RefreshPoolConfig,
) -> Result<Vec<RefreshReport>, RefreshAllError> {
    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let job_rx = Arc::new(job_rx);
    let (result_tx, result_rx) = mpsc::channel::<Outcome>();

    let num_workers = pool.num_workers.clamp(1, dirs.len().max(1));
    info!(
        units = dirs.len(),
        num_workers,
        stack_size = pool.stack_size,
        dry_run,
        "starting refresh-all"
    );

    let mut spawned = 0;
    for worker_id in 0..num_workers {
        let jobs = Arc::clone(&job_rx);
        let results = result_tx.clone();
        let defaults = Arc::clone(&defaults);
        let root = project_root.to_path_buf();

        // SAFETY: the closure owns everything it touches; the only shared
        // state is the channel pair and the read-only defaults.
        let spawn_result = unsafe {
            may::coroutine::Builder::new()
                .stack_size(pool.stack_size)
                .spawn(move || {
                    debug!(worker_id, "refresh worker started");
                    while let Ok((index, dir)) = jobs.recv() {
                        let outcome = run_job(&defaults, &root, &dir, dry_run);
                        if results.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                    debug!(worker_id, "refresh worker exiting");
                })
        };
        match spawn_result {
            Ok(_) => spawned += 1,
            Err(e) => error!(worker_id, error = %e, "failed to spawn refresh worker"),
        }
    }

    let total = dirs.len();
    if spawned == 0 {
        warn!("no refresh workers could be spawned, running inline");
        drop(job_rx);
        for (index, dir) in dirs.iter().enumerate() {
            let outcome = run_job(&defaults, project_root, dir, dry_run);
            if result_tx.send((index, outcome)).is_err() {
                break;
            }
        }
    } else {
        for (index, dir) in dirs.iter().enumerate() {
            if job_tx.send((index, dir.clone())).is_err() {
                error!(directory = %dir.display(), "refresh workers are gone");
                break;
            }
        }
    }
    drop(job_tx);
    drop(result_tx);

    let mut outcomes: Vec<Option<Result<RefreshReport, RefreshError>>> =
        (0..total).map(|_| None).collect();
    while let Ok((index, outcome)) = result_rx.recv() {
        if let Some(slot) = outcomes.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    let mut reports = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (outcome, dir) in outcomes.into_iter().zip(dirs) {
        match outcome {
            Some(Ok(report)) => reports.push(report),
            Some(Err(e)) => failures.push(e),
            None => failures.push(RefreshError {
                directory: dir,
                stage: Stage::Worker,
                error: anyhow!("no result was reported"),
            }),
        }
    }

    info!(
        succeeded = reports.len(),
        failed = failures.len(),
        "refresh-all finished"
    );
    if failures.is_empty() {
        Ok(reports)
    } else {
        Err(RefreshAllError {
            failures,
            succeeded: reports.len(),
        })
    }
}

fn run_job(
    defaults: &Config,
    project_root: &Path,
    dir: &Path,
    dry_run: bool,
) -> Result<RefreshReport, RefreshError> {
    catch_unwind(AssertUnwindSafe(|| {
        refresh_with_defaults(defaults, project_root, dir, dry_run)
    }))
    .unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(directory = %dir.display(), panic_message = %message, "refresh worker panicked");
        Err(RefreshError {
            directory: dir.to_path_buf(),
            stage: Stage::Worker,
            error: anyhow!("panicked: {message}"),
        })
    })
}
