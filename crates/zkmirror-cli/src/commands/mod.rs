//! CLI subcommands

use std::path::PathBuf;

use anyhow::Result;
use zkmirror_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod completions;
pub mod config;
pub mod sync;
pub mod tree;

/// Exit status of a command that completed without failures
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status when some path or operation failed
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the configuration cannot be parsed or fails validation
pub const EXIT_INVALID_CONFIG: u8 = 2;

/// Global options shared by every subcommand
#[derive(Debug, Clone)]
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Configuration from `--config` (or the default path)
    ///
    /// Defaults apply only when the file does not exist; a file that fails to
    /// parse is an error, never silently replaced.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_if_present(&self.config_path)
    }
}

/// clap value parser for node path arguments; trailing separators are dropped
pub fn parse_node_path(value: &str) -> Result<zkmirror_core::domain::NodePath, String> {
    zkmirror_core::domain::NodePath::normalize(value).map_err(|e| e.to_string())
}
