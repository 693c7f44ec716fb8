//! Trellis CLI - Command line interface for Trellis.
//!
//! This crate provides a CLI for checking and rendering a project's views
//! through the same dispatcher a web application uses.

use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, fmt};
use trellis_core::AdapterConfig;

mod cli;
mod config;
mod error;
mod output;
mod run;

use cli::{Args, Command};
use config::ConfigManager;
use output::OutputFormatter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Resolve the project path
    let project_path = if args.path == "." {
        std::env::current_dir().context("Failed to get current directory")?
    } else {
        PathBuf::from(&args.path)
    };

    // Initialize tracing
    init_tracing(&args, &project_path)?;

    debug!("Trellis CLI starting with command: {:?}", args.command);

    debug!("Project path: {}", project_path.display());

    match args.command {
        Command::Init(init_args) => execute_init(project_path, init_args)?,
        Command::List(list_args) => execute_list(project_path, list_args.verbose)?,
        Command::Check => execute_check(project_path)?,
        Command::Render(render_args) => execute_render(project_path, render_args)?,
    }

    info!("Trellis CLI completed successfully");
    Ok(())
}

/// Initialize tracing subscriber.
///
/// Library crates log at the project's `logging.level` unless `--verbose`
/// is given.
fn init_tracing(args: &Args, project_path: &Path) -> Result<()> {
    let (log_level, library_level) = if args.verbose {
        (Level::DEBUG, "debug".to_string())
    } else {
        let config_file = ConfigManager::config_file_path(project_path);
        let configured = AdapterConfig::load_from_file(&config_file)
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "warn".to_string());
        (Level::WARN, configured)
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive(format!("trellis_core={library_level}").parse()?)
        .add_directive(format!("trellis_views={library_level}").parse()?);

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn load_config(project_path: &Path) -> Result<ConfigManager> {
    ConfigManager::load(project_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            project_path.display()
        )
    })
}

/// Execute init command.
fn execute_init(project_path: PathBuf, args: cli::InitArgs) -> Result<()> {
    info!("Initializing Trellis project");

    let project_path = args.path.map_or(project_path, PathBuf::from);
    run::init(&project_path, args.force)?;

    Ok(())
}

/// Execute list command.
fn execute_list(project_path: PathBuf, verbose: bool) -> Result<()> {
    let config = load_config(&project_path)?;
    run::list_views(&config, verbose)?;
    Ok(())
}

/// Execute check command.
fn execute_check(project_path: PathBuf) -> Result<()> {
    let config = load_config(&project_path)?;
    run::check_views(&config).context("View check failed")?;
    Ok(())
}

/// Execute render command.
fn execute_render(project_path: PathBuf, args: cli::RenderArgs) -> Result<()> {
    info!("Rendering view: {}", args.template);

    let config = load_config(&project_path)?;
    let response = run::render(&config, &args)
        .with_context(|| format!("Failed to render {}", args.template))?;

    OutputFormatter::new().response(&response, args.headers);
    Ok(())
}
