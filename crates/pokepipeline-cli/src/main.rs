//! PokePipeline CLI
//!
//! Fetches pokemon from PokeAPI and loads them into a normalized SQLite
//! database, one transaction per pokemon:
//!
//! ```text
//! pokepipeline --start-id 1 --end-id 20
//! pokepipeline --ids 1 4 7 25 --db pokedex.db
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use pokepipeline_storage::Store;
use pokepipeline_sync::{
    Fetcher, Pipeline, PipelineConfig, PipelineObserver, RunSummary, TracingObserver,
};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod console;

use console::ConsoleObserver;

/// Ids fetched when neither `--ids` nor `--start-id` is given.
const DEFAULT_IDS: RangeInclusive<i64> = 1..=20;

#[derive(Parser, Debug)]
#[command(name = "pokepipeline")]
#[command(
    author,
    version,
    about = "PokePipeline: fetch and store Pokemon data"
)]
struct Cli {
    /// Pokemon ids to fetch
    #[arg(long, num_args = 1.., conflicts_with = "start_id")]
    ids: Option<Vec<i64>>,

    /// First id of an inclusive range
    #[arg(long)]
    start_id: Option<i64>,

    /// Last id of the range (defaults to `--start-id`)
    #[arg(long, requires = "start_id")]
    end_id: Option<i64>,

    /// SQLite database path [env: POKEPIPELINE_DB] [default: pokepipeline.db]
    #[arg(long)]
    db: Option<PathBuf>,

    /// API root [env: POKEPIPELINE_BASE_URL] [default: https://pokeapi.co/api/v2]
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds [env: POKEPIPELINE_TIMEOUT_SECS]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Attempts per request before giving up [env: POKEPIPELINE_MAX_RETRIES]
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff in milliseconds, scaled by attempt [env: POKEPIPELINE_BACKOFF_MS]
    #[arg(long)]
    backoff_ms: Option<u64>,

    /// Send progress to the log instead of stdout
    #[arg(short, long)]
    quiet: bool,

    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` wins if set.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env()?;
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_retries {
            config.retry.max_retries = n;
        }
        if let Some(ms) = self.backoff_ms {
            config.retry.backoff = Duration::from_millis(ms);
        }
        Ok(config.validate()?)
    }

    fn ids(&self) -> Result<Vec<i64>> {
        select_ids(self.ids.as_deref(), self.start_id, self.end_id)
    }
}

fn select_ids(ids: Option<&[i64]>, start: Option<i64>, end: Option<i64>) -> Result<Vec<i64>> {
    match (ids, start) {
        (Some(ids), _) => Ok(ids.to_vec()),
        (None, Some(start)) => {
            let end = end.unwrap_or(start);
            if end < start {
                return Err(anyhow!(
                    "--end-id ({end}) must not be smaller than --start-id ({start})"
                ));
            }
            Ok((start..=end).collect())
        }
        (None, None) => Ok(DEFAULT_IDS.collect()),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &RunSummary, store: &Store) -> Result<()> {
    println!(
        "{} stored={} skipped={} failed={}",
        "Summary".green().bold(),
        summary.stored(),
        summary.skipped(),
        summary.failed()
    );
    for (id, reason) in &summary.failures {
        println!("  {} id={id}: {reason}", "✗".red());
    }
    for (table, rows) in store.table_counts().context("failed to count rows")? {
        println!("  {} {table}: {rows}", "→".yellow());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config()?;
    let ids = cli.ids()?;

    let mut store = Store::open(&config.db_path)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    let fetcher = Fetcher::from_config(&config)?;

    println!(
        "{} {} id(s) from {} into {}",
        "PokePipeline".green().bold(),
        ids.len(),
        config.base_url,
        config.db_path.display()
    );

    let observer: &dyn PipelineObserver = if cli.quiet {
        &TracingObserver
    } else {
        &ConsoleObserver
    };
    tracing::info!(
        ids = ids.len(),
        base_url = %config.base_url,
        db = %config.db_path.display(),
        "run started"
    );
    let summary = Pipeline::new(fetcher, &mut store, observer, config.base_url.as_str()).run(&ids);
    tracing::info!(
        stored = summary.stored(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "run finished"
    );

    print_summary(&summary, &store)?;
    println!("Done.");
    Ok(())
}
