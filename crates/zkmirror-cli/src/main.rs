//! zkmirror CLI - Mirror local directory trees into a coordination namespace
//!
//! Provides commands for:
//! - Mirroring a file or directory under a node prefix
//! - Inspecting the mirrored namespace
//! - Viewing and editing configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zkmirror_core::config::Config;

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, sync::SyncCommand, tree::TreeCommand,
    CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "zkmirror",
    version,
    about = "Mirror local directory trees into a coordination namespace"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror a local file or directory under a node
    Sync(SyncCommand),
    /// Print the mirrored namespace
    Tree(TreeCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter for the `-v` count, starting from the configured level
fn log_filter(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing; RUST_LOG wins over both -v and logging.level
    let filter = log_filter(&config.logging.level, cli.verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CliContext {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
        config_path,
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Tree(cmd) => cmd.execute(&ctx),
        Commands::Config(cmd) => cmd.execute(&ctx),
        Commands::Completions(cmd) => cmd.execute(),
    }
}
