use crate::codec::Language;
use crate::config::{Config, GeneralConfig};
use crate::logging::{init_logging_with_config, LogConfig};
use crate::parser::SpecificationFormat;
use crate::refresh::{self, RefreshPoolConfig, RefreshReport};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Command-line interface for clientgen
#[derive(Parser, Debug)]
#[command(name = "clientgen")]
#[command(about = "Generate client libraries from protobuf descriptors or OpenAPI documents", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a library into a new directory and record its configuration
    Generate {
        /// Directory to generate into
        #[arg(short, long)]
        output: PathBuf,

        /// Root for relative paths and the defaults file
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// Target language
        #[arg(long, value_parser = Language::from_str)]
        language: Option<Language>,

        /// `protobuf` or `openapi`
        #[arg(long, value_parser = SpecificationFormat::from_str)]
        specification_format: Option<SpecificationFormat>,

        /// Descriptor file prefix or OpenAPI document path
        #[arg(long)]
        specification_source: String,

        /// Service configuration YAML
        #[arg(long)]
        service_config: Option<String>,

        /// Template directory
        #[arg(long)]
        template_dir: Option<String>,

        /// Parser option, repeatable
        #[arg(long = "source", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        source: Vec<(String, String)>,

        /// Codec option, repeatable
        #[arg(long = "codec", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        codec: Vec<(String, String)>,

        /// Parse, validate and render without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Regenerate one directory from its configuration
    Refresh {
        /// Directory to refresh
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Root for relative paths and the defaults file
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// Parse, validate and render without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Regenerate every configured directory below the project root
    RefreshAll {
        /// Root to search and the location of the defaults file
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// Parse, validate and render without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Concurrent workers (default: CLIENTGEN_REFRESH_WORKERS or 4)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn summarize(report: &RefreshReport) {
    let verb = if report.dry_run { "would write" } else { "wrote" };
    println!(
        "{}: {verb} {} file(s)",
        report.directory.display(),
        report.files.len()
    );
}

/// Parse arguments, set up logging and run the command.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized or the command fails.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config = log_config.verbose();
    }
    init_logging_with_config(&log_config)?;
    execute(cli)
}

/// Run an already parsed command.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            output,
            project_root,
            language,
            specification_format,
            specification_source,
            service_config,
            template_dir,
            source,
            codec,
            dry_run,
        } => {
            let local = Config {
                general: GeneralConfig {
                    language,
                    specification_format,
                    specification_source: Some(specification_source),
                    service_config,
                    template_dir,
                },
                source: source.into_iter().collect::<BTreeMap<_, _>>(),
                codec: codec.into_iter().collect::<BTreeMap<_, _>>(),
            };
            let defaults = refresh::load_defaults(&project_root)?;
            let report = refresh::generate(&defaults, &local, &project_root, &output, dry_run)?;
            summarize(&report);
            Ok(())
        }
        Commands::Refresh {
            directory,
            project_root,
            dry_run,
        } => {
            let report = refresh::refresh(&project_root, &directory, dry_run)?;
            summarize(&report);
            Ok(())
        }
        Commands::RefreshAll {
            project_root,
            dry_run,
            jobs,
        } => {
            let mut pool = RefreshPoolConfig::from_env();
            if let Some(jobs) = jobs {
                pool = pool.with_workers(jobs);
            }
            let reports = refresh::refresh_all(&project_root, dry_run, &pool)
                .with_context(|| format!("refresh-all in {}", display_root(&project_root)))?;
            for report in &reports {
                summarize(report);
            }
            Ok(())
        }
    }
}

fn display_root(root: &Path) -> String {
    root.canonicalize()
        .unwrap_or_else(|_| root.to_path_buf())
        .display()
        .to_string()
}
