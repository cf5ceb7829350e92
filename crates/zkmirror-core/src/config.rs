//! Configuration module for zkmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for zkmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of node writes in flight at once (`0` = unbounded).
    pub max_concurrent_writes: u32,
    /// Mirror symbolic links as their targets instead of skipping them.
    pub follow_symlinks: bool,
}

/// In-memory coordination store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot the namespace is loaded from and saved to.
    pub snapshot: PathBuf,
    /// Simulated latency of every store operation, in milliseconds.
    pub latency_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    ///
    /// Missing sections and fields take their default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Load from `path`, or defaults when no file exists there.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_if_present(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/zkmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("zkmirror")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_writes: 0,
            follow_symlinks: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("zkmirror");
        Self {
            snapshot: data_dir.join("namespace.json"),
            latency_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_concurrent_writes"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.max_concurrent_writes`.
pub const MAX_CONCURRENT_WRITES: u32 = 1024;

/// Upper bound for `store.latency_ms`.
pub const MAX_LATENCY_MS: u64 = 60_000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.max_concurrent_writes > MAX_CONCURRENT_WRITES {
            errors.push(ValidationError {
                field: "sync.max_concurrent_writes".into(),
                message: format!(
                    "must be at most {MAX_CONCURRENT_WRITES} (0 means unbounded), got {}",
                    self.sync.max_concurrent_writes
                ),
            });
        }

        // --- store ---
        if self.store.snapshot.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "store.snapshot".into(),
                message: "must not be empty".into(),
            });
        } else if self.store.snapshot.is_dir() {
            errors.push(ValidationError {
                field: "store.snapshot".into(),
                message: format!("is a directory: {}", self.store.snapshot.display()),
            });
        }
        if self.store.latency_ms > MAX_LATENCY_MS {
            errors.push(ValidationError {
                field: "store.latency_ms".into(),
                message: format!(
                    "must be at most {MAX_LATENCY_MS}, got {}",
                    self.store.latency_ms
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "must be one of {}, got '{}'",
                    VALID_LOG_LEVELS.join(", "),
                    self.logging.level
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and lets callers override individual
/// fields with a fluent API.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_max_concurrent_writes(mut self, n: u32) -> Self {
        self.config.sync.max_concurrent_writes = n;
        self
    }

    pub fn sync_follow_symlinks(mut self, follow: bool) -> Self {
        self.config.sync.follow_symlinks = follow;
        self
    }

    // --- store ---

    pub fn store_snapshot(mut self, snapshot: PathBuf) -> Self {
        self.config.store.snapshot = snapshot;
        self
    }

    pub fn store_latency_ms(mut self, ms: u64) -> Self {
        self.config.store.latency_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
