//! CLI argument parsing for Trellis CLI.

use clap::{Parser, Subcommand};

/// Trellis CLI - render framework views from the command line.
///
/// Loads a project's views the way the render dispatcher does and renders
/// them against a simulated request.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the Trellis project directory.
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize a new Trellis project.
    Init(InitArgs),

    /// List the project's views.
    List(ListArgs),

    /// Compile every view and report failures.
    Check,

    /// Render a view for a simulated request.
    Render(RenderArgs),
}

/// Arguments for the init subcommand.
#[derive(Debug, clap::Args)]
pub struct InitArgs {
    /// Path to initialize the project.
    #[arg(short, long)]
    pub path: Option<String>,

    /// Overwrite an existing configuration.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the list subcommand.
#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Show content type and charset of each view.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the render subcommand.
#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// View name, or an error page such as `not_found` with `--error`.
    pub template: String,

    /// Treat the template as an error page name.
    #[arg(long)]
    pub error: bool,

    /// Message shown on error pages.
    #[arg(short, long, default_value = "")]
    pub message: String,

    /// Values bound to the view, as a JSON object.
    #[arg(short, long)]
    pub data: Option<String>,

    /// Context path of the simulated request.
    #[arg(long, default_value = "")]
    pub context_path: String,

    /// Accept-Language header of the simulated request.
    #[arg(long, env = "TRELLIS_LANG")]
    pub lang: Option<String>,

    /// Print response status and headers before the body.
    #[arg(long)]
    pub headers: bool,
}
