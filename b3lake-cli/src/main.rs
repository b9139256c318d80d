//! B3Lake CLI — daily ingestion, backfill, and partition routing commands.
//!
//! Commands:
//! - `ingest` — fetch one session of B3 quotes and write its raw partition
//! - `backfill` — walk an inclusive historical range, one partition per day
//! - `route` — turn a partition-arrival key into a refinement job start
//! - `fetch` — pull a quote window into a local Parquet file, no store

use anyhow::{bail, Result};
use b3lake_core::normalize::fetch_and_normalize;
use b3lake_core::partition::{frame_to_parquet_bytes, parse_partition_key};
use b3lake_core::provider::{FetchRange, QuoteRequest, YahooProvider};
use b3lake_core::store::FsStore;
use b3lake_core::ticker;
use b3lake_runner::{
    backfill, run_ingestion, ArrivalEvent, BackfillSummary, HttpJobTrigger, IngestionConfig,
    IngestionResult, JobRequest, PartitionRouter, RefinedTrigger, Settings,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "b3lake", about = "B3Lake CLI — B3 quote lake ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one session of quotes and write its dt= partition.
    Ingest {
        /// Partition date (YYYY-MM-DD). Defaults to the previous business day.
        #[arg(long)]
        date: Option<String>,

        /// Settings file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store root directory. Overrides settings.
        #[arg(long)]
        store_root: Option<PathBuf>,
    },
    /// Ingest every day in an inclusive historical range.
    Backfill {
        /// Range start (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Range end (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Job endpoint URL. When set, each written partition starts
        /// its refinement job.
        #[arg(long)]
        trigger_url: Option<String>,

        /// Settings file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store root directory. Overrides settings.
        #[arg(long)]
        store_root: Option<PathBuf>,
    },
    /// Route a partition-arrival notification to the refinement job.
    Route {
        /// Object key of the arrived partition (e.g. raw/dt=2026-02-20/data.parquet).
        key: String,

        /// Store name carried by the notification.
        #[arg(long, default_value = "b3-lake")]
        bucket: String,

        /// Job endpoint URL. Without it, the command prints the job
        /// request it would send and stops.
        #[arg(long)]
        trigger_url: Option<String>,

        /// Settings file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Fetch a quote window straight to a local Parquet file.
    Fetch {
        /// Output file path.
        #[arg(long, default_value = "b3_data.parquet")]
        out: PathBuf,

        /// Window start (YYYY-MM-DD). Requires --end; overrides --period.
        #[arg(long)]
        start: Option<String>,

        /// Window end (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Relative window in provider syntax (e.g. 5d, 1y).
        #[arg(long, default_value = "1y")]
        period: String,

        /// Settings file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            date,
            config,
            store_root,
        } => run_ingest(date, config, store_root),
        Commands::Backfill {
            start,
            end,
            trigger_url,
            config,
            store_root,
        } => run_backfill(start, end, trigger_url, config, store_root),
        Commands::Route {
            key,
            bucket,
            trigger_url,
            config,
        } => run_route(key, bucket, trigger_url, config),
        Commands::Fetch {
            out,
            start,
            end,
            period,
            config,
        } => run_fetch(out, start, end, period, config),
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    settings.apply_env();
    Ok(settings)
}

fn run_ingest(
    date: Option<String>,
    config: Option<PathBuf>,
    store_root: Option<PathBuf>,
) -> Result<()> {
    let mut settings = load_settings(config.as_deref())?;
    if let Some(root) = store_root {
        settings.store_root = root;
    }

    let provider = YahooProvider::new();
    let store = FsStore::new(&settings.store_root);
    let ingest_config = IngestionConfig::from_settings(&settings, date);
    let today = chrono::Local::now().date_naive();

    let result = run_ingestion(&provider, &store, &ingest_config, today)?;
    print_ingestion(&result);

    Ok(())
}

fn run_backfill(
    start: String,
    end: String,
    trigger_url: Option<String>,
    config: Option<PathBuf>,
    store_root: Option<PathBuf>,
) -> Result<()> {
    let mut settings = load_settings(config.as_deref())?;
    if let Some(root) = store_root {
        settings.store_root = root;
    }

    let start_date = NaiveDate::parse_from_str(&start, "%Y-%m-%d")?;
    let end_date = NaiveDate::parse_from_str(&end, "%Y-%m-%d")?;

    let provider = YahooProvider::new();
    let store = FsStore::new(&settings.store_root);
    let ingest_config = IngestionConfig::from_settings(&settings, None);

    let http_trigger = trigger_url.map(HttpJobTrigger::new);
    let refined = http_trigger.as_ref().map(|trigger| RefinedTrigger {
        trigger,
        job_name: &settings.job_name,
    });

    let summary = backfill(
        &provider,
        &store,
        &ingest_config,
        start_date,
        end_date,
        refined.as_ref(),
    )?;
    print_backfill(&summary, start_date, end_date);

    if !summary.all_succeeded() {
        for (dt, err) in &summary.failures {
            eprintln!("Error for {dt}: {err}");
        }
        for (dt, err) in &summary.dispatch_failures {
            eprintln!("Dispatch error for {dt}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_route(
    key: String,
    bucket: String,
    trigger_url: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(config.as_deref())?;

    let Some(url) = trigger_url else {
        // Dry run: show the job request this key would produce.
        let dt = parse_partition_key(&key, &settings.prefix)?;
        let request = JobRequest {
            job_name: settings.job_name,
            dt,
        };
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    };

    let trigger = HttpJobTrigger::new(url);
    let router = PartitionRouter::new(&trigger, settings.job_name.clone(), settings.prefix.clone());

    let run = router.handle_event(&ArrivalEvent { bucket, key })?;
    println!(
        "Started {} for dt={} (run id: {})",
        run.job_name,
        run.dt,
        run.run_id.as_deref().unwrap_or("n/a")
    );

    Ok(())
}

fn run_fetch(
    out: PathBuf,
    start: Option<String>,
    end: Option<String>,
    period: String,
    config: Option<PathBuf>,
) -> Result<()> {
    if start.is_some() != end.is_some() {
        bail!("--start and --end must be given together");
    }

    let settings = load_settings(config.as_deref())?;
    let tickers = ticker::resolve(&settings.tickers)?;

    let range = match (start.as_deref(), end.as_deref()) {
        (Some(s), Some(e)) => FetchRange::Between {
            start: NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            end: NaiveDate::parse_from_str(e, "%Y-%m-%d")?,
        },
        _ => FetchRange::Period(period),
    };

    let provider = YahooProvider::new();
    let request = QuoteRequest {
        tickers,
        range,
        interval: settings.interval.clone(),
    };

    let normalized = fetch_and_normalize(&provider, &request, None)?;
    let bytes = frame_to_parquet_bytes(&normalized.table)?;
    std::fs::write(&out, &bytes)?;

    println!("Wrote {} rows to {}", normalized.table.height(), out.display());
    if normalized.dropped_rows > 0 {
        println!("Dropped {} incomplete row(s).", normalized.dropped_rows);
    }

    Ok(())
}

fn print_ingestion(result: &IngestionResult) {
    if result.skipped {
        println!("No trading session on {}; nothing ingested.", result.dt);
        return;
    }

    println!();
    println!("=== Ingestion Result ===");
    println!("Date:      {}", result.dt);
    println!("Rows:      {}", result.rows_ingested);
    println!("Tickers:   {}", result.ticker_count);
    if let Some(uri) = &result.uri {
        println!("Partition: {uri}");
    }
    println!();
}

fn print_backfill(summary: &BackfillSummary, start: NaiveDate, end: NaiveDate) {
    println!();
    println!("=== Backfill Summary ===");
    println!("Range:      {start} to {end}");
    println!("Ingested:   {} partition(s)", summary.ingested_count());
    println!("Skipped:    {} non-trading day(s)", summary.skipped_count());
    println!("Failures:   {}", summary.failures.len());
    println!("Dispatched: {} refinement run(s)", summary.dispatched.len());
    println!();
}
