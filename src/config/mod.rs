//! Configuration module
//!
//! Handles loading and managing configuration.

pub mod env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::{PoolOptions, ReporterFormat};
use crate::models::is_yaml_file;
use crate::output::OutputFormat;

pub use env::EnvConfig;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./split-runner.yaml",
    "./split-runner.yml",
    "./.split-runner.yaml",
    "~/.config/split-runner/config.yaml",
];

/// Known runner names
pub const RUNNERS: &[&str] = &["builtin", "newman"];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Runner used for partitions (builtin, newman)
    pub runner: String,

    /// Command used by the newman runner
    pub newman_command: String,

    /// HTTP timeout in seconds for the built-in runner
    pub timeout_secs: u64,

    /// Limit for one partition in seconds, 0 for none
    pub partition_timeout_secs: u64,

    /// Maximum partitions running at once, 0 for no limit
    pub max_concurrent: usize,

    /// Abort running partitions after the first failure
    pub cancel_on_failure: bool,

    /// Output format (text, json, json-pretty, csv)
    pub format: String,

    /// Colorize text output
    pub color: bool,

    /// Accept invalid TLS certificates
    pub insecure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runner: "builtin".to_string(),
            newman_command: "newman".to_string(),
            timeout_secs: 30,
            partition_timeout_secs: 0,
            max_concurrent: 0,
            cancel_on_failure: false,
            format: "text".to_string(),
            color: true,
            insecure: false,
        }
    }
}

impl AppConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from an explicit path, a standard location, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::find) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    ///
    /// Values are not validated here; `run` validates after applying overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !RUNNERS.contains(&self.runner.as_str()) {
            anyhow::bail!(
                "Unknown runner '{}'. Valid runners: {}",
                self.runner,
                RUNNERS.join(", ")
            );
        }
        if OutputFormat::from_str(&self.format).is_none() {
            anyhow::bail!("Unknown output format '{}'", self.format);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }
        if self.runner == "newman" && self.newman_command.trim().is_empty() {
            anyhow::bail!("newman_command must not be empty");
        }
        Ok(())
    }

    /// Apply environment overrides
    pub fn merge_env(mut self, env: &EnvConfig) -> Self {
        if let Some(runner) = &env.runner {
            self.runner = runner.clone();
        }
        if let Some(command) = &env.newman_command {
            self.newman_command = command.clone();
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(timeout) = env.partition_timeout {
            self.partition_timeout_secs = timeout;
        }
        if let Some(concurrent) = env.concurrent {
            self.max_concurrent = concurrent;
        }
        if let Some(cancel) = env.cancel_on_failure {
            self.cancel_on_failure = cancel;
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(color) = env.color {
            self.color = color;
        }
        if let Some(insecure) = env.insecure {
            self.insecure = insecure;
        }
        self
    }

    /// Pool settings derived from this configuration
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_concurrent: self.max_concurrent,
            partition_timeout: (self.partition_timeout_secs > 0)
                .then(|| Duration::from_secs(self.partition_timeout_secs)),
            cancel_on_failure: self.cancel_on_failure,
            format: ReporterFormat::Json,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_str(&self.format).unwrap_or(OutputFormat::Text)
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
