#![allow(clippy::doc_markdown)]
//! `ngramdb` CLI - line-protocol driver for the phrase matching engine
//!
//! Usage:
//!   `ngramdb < operations.txt`
//!   `ngramdb --input operations.txt --workers 8`
//!   `ngramdb --config ./ngramdb.toml --log-level debug`
//!
//! Results go to stdout; logs go to stderr.

mod protocol;
mod session;

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ngramdb_core::{BatchPipeline, Engine, LoggingConfig, NgramConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ngramdb")]
#[command(
    author,
    version,
    about = "ngramdb - incremental multi-pattern phrase matcher"
)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(short, long, env = "NGRAMDB_CONFIG", default_value = "ngramdb.toml")]
    config: PathBuf,

    /// Read operations from a file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of matching workers (0 = one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NgramConfig::load_from_path(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(workers) = cli.workers {
        config.pipeline.workers = workers;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging);

    let engine = Engine::new(config)?;
    let mut pipeline = BatchPipeline::new(engine)?;
    let output = BufWriter::new(io::stdout().lock());

    let result = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening input {}", path.display()))?;
            session::run(&mut pipeline, BufReader::new(file), output)
        }
        None => session::run(&mut pipeline, io::stdin().lock(), output),
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(error = %err, "aborting");
            return Err(err);
        }
    };

    let stats = pipeline.engine().stats();
    tracing::info!(
        operations = summary.operations,
        results = summary.results,
        stats = %serde_json::to_string(&stats)?,
        "input exhausted"
    );
    Ok(())
}
