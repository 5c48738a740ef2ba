//! split-runner - concurrent collection runner
//!
//! Splits an API test collection into its top-level folders, runs every
//! folder at the same time, and reports failed assertions in the order and
//! with the folder path they have in the original collection.
//!
//! ## Usage
//!
//! ```bash
//! # Run a collection with the built-in HTTP runner
//! split-runner run api.postman_collection.json
//!
//! # Run through newman, at most 4 folders at once
//! split-runner run api.json --runner newman --concurrent 4
//!
//! # Check a collection and show its partitions
//! split-runner list api.json
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info, warn};

mod aggregate;
mod cli;
mod config;
mod executor;
mod http;
mod models;
mod output;
mod partition;
mod resolver;
mod utils;

use aggregate::{aggregate, RunSummary};
use cli::Args;
use config::{AppConfig, EnvConfig};
use executor::{AnyRunner, HttpRunner, NewmanRunner, RunnerPool};
use models::Collection;
use output::{OutputFormat, ReportFormatter};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        args.log_level
            .as_deref()
            .or(env.log_level.as_deref())
            .and_then(LogLevel::from_str)
            .unwrap_or(LogLevel::Info)
    };
    init_logger(level);

    let config_path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(Into::into));
    if env.has_any() {
        debug!("Applying SPLIT_RUNNER_* environment overrides");
    }

    match args.command {
        cli::Command::Run(run_args) => {
            let config = AppConfig::load_or_default(config_path.as_deref())?.merge_env(&env);
            run_command(run_args, config).await
        }
        cli::Command::List(list_args) => {
            list_partitions(list_args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, config_path.as_deref(), &env)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_command(args: cli::RunArgs, mut config: AppConfig) -> Result<ExitCode> {
    if let Some(runner) = args.runner {
        config.runner = runner;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(concurrent) = args.concurrent {
        config.max_concurrent = concurrent;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(timeout) = args.partition_timeout {
        config.partition_timeout_secs = timeout;
    }
    if args.cancel_on_failure {
        config.cancel_on_failure = true;
    }
    if args.no_color {
        config.color = false;
    }
    if args.insecure {
        config.insecure = true;
    }
    config.validate()?;

    let mut collection = Collection::load(&args.collection)?;

    info!(
        "Running '{}' from {} with the {} runner",
        collection.name(),
        args.collection.display(),
        config.runner
    );

    let pool = RunnerPool::new(build_runner(&config)?).with_options(config.pool_options());

    let started_at = Utc::now();
    let results = executor::run_collection(&mut collection, &pool).await?;
    let summary = RunSummary::new(&results, started_at);

    let mut formatter = ReportFormatter::new(config.output_format());
    if !config.color || !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let reported = formatter.write_reports(&mut out, aggregate(results), &summary)?;
    out.flush().context("Failed to flush output")?;

    if summary.is_all_passed() {
        info!(
            "All {} assertions passed across {} partitions in {}ms",
            summary.assertions, summary.partitions, summary.duration_ms
        );
    } else {
        info!(
            "{} requests with failed assertions across {} partitions in {}ms",
            reported, summary.partitions, summary.duration_ms
        );
    }

    if args.strict && reported > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn build_runner(config: &AppConfig) -> Result<AnyRunner> {
    match config.runner.as_str() {
        "newman" => Ok(AnyRunner::Newman(
            NewmanRunner::new(&config.newman_command).insecure(config.insecure),
        )),
        _ => Ok(AnyRunner::Http(HttpRunner::new(
            config.timeout_secs,
            config.insecure,
        )?)),
    }
}

fn list_partitions(args: cli::ListArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    let mut collection = Collection::load(&args.collection)?;
    let partitions = partition::partition(&mut collection)?;

    print!(
        "{}",
        ReportFormatter::new(format).format_partitions(&partitions)?
    );

    Ok(())
}

/// Only `show` reads the configuration file, and it does not reject invalid values.
fn manage_config(args: cli::ConfigArgs, config_path: Option<&Path>, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show => {
            let config = AppConfig::load_or_default(config_path)?.merge_env(env);
            let content = serde_yaml::to_string(&config).context("Failed to serialize config")?;
            print!("{content}");
            if let Err(e) = config.validate() {
                warn!("{e}");
            }
        }
        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                );
            }
            AppConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        cli::ConfigAction::Env => config::env::print_env_help(),
    }
    Ok(())
}
