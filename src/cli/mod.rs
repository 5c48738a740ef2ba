//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run the top-level folders of a collection concurrently and report failures by path
#[derive(Parser, Debug)]
#[command(name = "split-runner")]
#[command(version)]
#[command(about = "Run collection folders concurrently and report failed assertions")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a collection
    Run(RunArgs),

    /// Validate a collection and list its partitions
    List(ListArgs),

    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Collection file (.json, .yaml, .yml)
    pub collection: PathBuf,

    /// Runner (builtin, newman)
    #[arg(short, long)]
    pub runner: Option<String>,

    /// Output format (text, json, json-pretty, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Maximum partitions running at once (0 = all)
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Per-partition time limit in seconds
    #[arg(long)]
    pub partition_timeout: Option<u64>,

    /// Abort running partitions when one fails
    #[arg(long)]
    pub cancel_on_failure: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Exit with status 1 when any assertion failed
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Collection file (.json, .yaml, .yml)
    pub collection: PathBuf,

    /// Output format (text, json, json-pretty)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Destination (.yaml or .json)
        #[arg(default_value = "split-runner.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List environment variables
    Env,
}
