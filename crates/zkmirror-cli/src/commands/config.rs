//! Config command - View and manage zkmirror configuration
//!
//! Provides the `zkmirror config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use zkmirror_core::config::Config;

use super::{CliContext, EXIT_FAILURE, EXIT_INVALID_CONFIG, EXIT_SUCCESS};
use crate::output::plural;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.max_concurrent_writes", "Max node writes in flight (0 = unbounded)"),
    ("sync.follow_symlinks", "true|false"),
    ("store.snapshot", "Namespace snapshot file"),
    ("store.latency_ms", "Simulated store latency (ms)"),
    ("logging.level", "trace|debug|info|warn|error"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.max_concurrent_writes")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub fn execute(&self, ctx: &CliContext) -> Result<ExitCode> {
        let status = match self {
            ConfigCommand::Show => execute_show(ctx)?,
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value)?,
            ConfigCommand::Validate => execute_validate(ctx),
        };
        Ok(ExitCode::from(status))
    }
}

/// Reports a configuration file that exists but cannot be read or parsed
fn report_unreadable(ctx: &CliContext, error: &anyhow::Error) -> u8 {
    let formatter = ctx.formatter();
    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": false,
            "config_path": ctx.config_path.display().to_string(),
            "error": format!("{error:#}"),
        }));
    } else {
        formatter.error(&format!("{error:#}"));
    }
    EXIT_INVALID_CONFIG
}

/// Show current configuration
fn execute_show(ctx: &CliContext) -> Result<u8> {
    let formatter = ctx.formatter();
    let config = match ctx.load_config() {
        Ok(config) => config,
        Err(e) => return Ok(report_unreadable(ctx, &e)),
    };

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Set a configuration value using dot-notation
///
/// An existing file that fails to parse is left untouched.
fn execute_set(ctx: &CliContext, key: &str, value: &str) -> Result<u8> {
    let formatter = ctx.formatter();
    let mut config = match ctx.load_config() {
        Ok(config) => config,
        Err(e) => return Ok(report_unreadable(ctx, &e)),
    };

    info!(key = %key, value = %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, description) in SUPPORTED_KEYS {
                formatter.info(&format!("  {:<28} - {}", name, description));
            }
        }
        return Ok(EXIT_FAILURE);
    }

    let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": errors,
            }));
        } else {
            formatter.error(&format!(
                "Invalid value for '{}': {}",
                key,
                errors.join("; ")
            ));
        }
        return Ok(EXIT_INVALID_CONFIG);
    }

    save_config(&config, &ctx.config_path)?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", ctx.config_path.display()));
    }

    Ok(EXIT_SUCCESS)
}

/// Validate configuration file
///
/// A missing file is valid: every setting takes its default.
fn execute_validate(ctx: &CliContext) -> u8 {
    let formatter = ctx.formatter();
    let config_path = &ctx.config_path;

    if !config_path.exists() {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "errors": [],
                "defaults": true,
            }));
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.success("Using default configuration");
        }
        return EXIT_SUCCESS;
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [format!("Failed to parse configuration: {}", e)],
                }));
            } else {
                formatter.error(&format!("Failed to parse configuration: {}", e));
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return EXIT_INVALID_CONFIG;
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();

    if ctx.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {}:",
            plural(errors.len(), "error")
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_INVALID_CONFIG
    }
}

/// Writes `config` as YAML, creating the parent directory if needed
fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// Supported keys are listed in [`SUPPORTED_KEYS`].
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.max_concurrent_writes" => {
            config.sync.max_concurrent_writes = value
                .parse::<u32>()
                .context("Expected a non-negative integer for sync.max_concurrent_writes")?;
        }
        "sync.follow_symlinks" => {
            config.sync.follow_symlinks = value
                .parse::<bool>()
                .context("Expected true or false for sync.follow_symlinks")?;
        }

        // --- store ---
        "store.snapshot" => {
            config.store.snapshot = PathBuf::from(value);
        }
        "store.latency_ms" => {
            config.store.latency_ms = value
                .parse::<u64>()
                .context("Expected a non-negative integer for store.latency_ms")?;
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
