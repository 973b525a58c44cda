//! fairhire CLI: run counterfactual hiring-bias audits from the terminal.
//!
//! Subcommands cover the whole flow: `sample` the corpus, `run` the first
//! pass, `verify` it with a second pass, then `evaluate` into the report.

mod commands;

use clap::Parser;
use fairhire_core::{Lang, ProtectedGroup};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// fairhire: counterfactual bias audit for LLM hiring decisions
#[derive(Parser, Debug)]
#[command(name = "fairhire", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds fairhire.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus language: en or uk
    #[arg(short, long, default_value = "en")]
    lang: Lang,

    /// Regenerate groups whose artifact already exists
    #[arg(long)]
    force: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Sample candidates and print the (candidate, job) pairings as JSON
    Sample {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// First pass: generate a decision for every counterfactual row
    Run {
        /// Restrict to these protected groups (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<ProtectedGroup>,
        /// Model name override
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Second pass: ask the generator to confirm or correct prior decisions
    Verify {
        /// Root of the first-pass artifacts (defaults to paths.results_root)
        #[arg(long)]
        prior: Option<PathBuf>,
        #[arg(short, long = "group")]
        groups: Vec<ProtectedGroup>,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Compute fairness metrics and append them to the report
    Evaluate {
        /// Root of the artifacts to evaluate (defaults to paths.results_root)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Experiment identifier written to every report row
        #[arg(short, long)]
        experiment: Option<String>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default fairhire.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "fairhire", "fairhire")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fairhire.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = fairhire_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if cli.force {
        config.force_run = true;
    }

    commands::handle_command(cli.command, config, cli.lang, &workspace).await
}
