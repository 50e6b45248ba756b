//! # mpdeck - Main Entry Point
//!
//! Parses arguments, sets up logging and platform directories, checks the
//! environment, then hands the terminal to [`mpdeck::tui::run`].

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use log::info;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mpdeck::app::{App, AppContext, Dispatcher, Executor, RefreshScheduler};
use mpdeck::backend::{Backend, MultipassCli};
use mpdeck::cli::Args;
use mpdeck::config::{AppConfig, AppDirs};
use mpdeck::domain::{ConfigError, PreflightError};
use mpdeck::host::HostCapacity;
use mpdeck::preflight::run_preflight_checks;
use mpdeck::templates::TemplateSources;
use mpdeck::tui;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_UNAVAILABLE: i32 = 69;

fn main() {
    let args = Args::parse();
    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_USAGE;
    }
    match err.downcast_ref::<PreflightError>() {
        Some(PreflightError::BackendNotFound { .. } | PreflightError::NotExecutable { .. }) => {
            EXIT_UNAVAILABLE
        }
        Some(PreflightError::NotATerminal) => EXIT_USAGE,
        None => EXIT_ERROR,
    }
}

/// Send log output to `path`; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let dirs = AppDirs::discover();
    init_logging(args.log_file.as_deref().unwrap_or(&dirs.log_file()))?;
    info!("mpdeck v{} starting", env!("CARGO_PKG_VERSION"));

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------
    let config = match &args.config {
        Some(path) => AppConfig::load(path, false)?,
        None => AppConfig::load(&dirs.config_file(), true)?,
    };

    let program = run_preflight_checks(&args.backend)?;
    let host = HostCapacity::detect();

    let sources = TemplateSources {
        local_dir: Some(args.templates_dir.clone().unwrap_or_else(|| dirs.templates_dir())),
        repo: if args.no_remote_templates { None } else { config.template_repo.clone() },
        cache_dir: dirs.template_cache_dir(),
    };

    // -------------------------------------------------------------------------
    // Wiring
    // -------------------------------------------------------------------------
    let backend: Arc<dyn Backend> =
        Arc::new(MultipassCli::new(program.to_string_lossy().into_owned()));
    let (tx, rx) = unbounded();
    let dispatcher = Dispatcher::new(Executor::new(backend, sources), tx.clone());
    let refresh = RefreshScheduler::new(Duration::from_millis(args.refresh_ms), tx);

    let app = App::new(AppContext::new(host, config));
    tui::run(app, &rx, &dispatcher, &refresh)
}
