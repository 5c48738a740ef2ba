//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "SPLIT_RUNNER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Runner from SPLIT_RUNNER_RUNNER
    pub runner: Option<String>,
    /// Newman command from SPLIT_RUNNER_NEWMAN
    pub newman_command: Option<String>,
    /// Timeout from SPLIT_RUNNER_TIMEOUT
    pub timeout: Option<u64>,
    /// Partition timeout from SPLIT_RUNNER_PARTITION_TIMEOUT
    pub partition_timeout: Option<u64>,
    /// Concurrency from SPLIT_RUNNER_CONCURRENT
    pub concurrent: Option<usize>,
    /// From SPLIT_RUNNER_CANCEL_ON_FAILURE
    pub cancel_on_failure: Option<bool>,
    /// Output format from SPLIT_RUNNER_FORMAT
    pub format: Option<String>,
    /// From SPLIT_RUNNER_COLOR
    pub color: Option<bool>,
    /// From SPLIT_RUNNER_INSECURE
    pub insecure: Option<bool>,
    /// Config file from SPLIT_RUNNER_CONFIG
    pub config_file: Option<String>,
    /// Log level from SPLIT_RUNNER_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            runner: get_env("RUNNER"),
            newman_command: get_env("NEWMAN"),
            timeout: get_env_parse("TIMEOUT"),
            partition_timeout: get_env_parse("PARTITION_TIMEOUT"),
            concurrent: get_env_parse("CONCURRENT"),
            cancel_on_failure: get_env_bool("CANCEL_ON_FAILURE"),
            format: get_env("FORMAT"),
            color: get_env_bool("COLOR"),
            insecure: get_env_bool("INSECURE"),
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.runner.is_some()
            || self.newman_command.is_some()
            || self.timeout.is_some()
            || self.partition_timeout.is_some()
            || self.concurrent.is_some()
            || self.cancel_on_failure.is_some()
            || self.format.is_some()
            || self.color.is_some()
            || self.insecure.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all SPLIT_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_RUNNER             Runner (builtin, newman)");
    println!("  {ENV_PREFIX}_NEWMAN             Command used by the newman runner");
    println!("  {ENV_PREFIX}_TIMEOUT            HTTP timeout in seconds");
    println!("  {ENV_PREFIX}_PARTITION_TIMEOUT  Per-partition limit in seconds");
    println!("  {ENV_PREFIX}_CONCURRENT         Maximum partitions at once (0 = all)");
    println!("  {ENV_PREFIX}_CANCEL_ON_FAILURE  Abort running partitions on failure");
    println!("  {ENV_PREFIX}_FORMAT             Output format (text, json, json-pretty, csv)");
    println!("  {ENV_PREFIX}_COLOR              Colorize text output (true/false)");
    println!("  {ENV_PREFIX}_INSECURE           Accept invalid TLS certificates (true/false)");
    println!("  {ENV_PREFIX}_CONFIG             Path to configuration file");
    println!("  {ENV_PREFIX}_LOG                Log level (trace, debug, info, warn, error)");
}
