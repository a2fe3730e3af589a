//! stockfeed CLI: populate the JSON data directory.
//!
//! Commands:
//! - `collect`: fetch full history from Alpha Vantage (`--update` merges
//!   only the recent window into existing datasets)
//! - `convert`: import `{TICKER}_historical_data.csv` exports
//! - `generate`: write synthetic random-walk datasets
//!
//! Per-ticker failures are printed and counted; they never change the exit
//! status. Only an unreadable or invalid config file does.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockfeed_core::data::{
    collect_all, default_presets, detect_anomalies, generate, rng_for, update_all,
    AlphaVantageProvider, BatchOptions, BatchSummary, CsvImporter, DatasetStore, StdoutProgress,
};
use stockfeed_core::{DailyBar, FeedConfig};

#[derive(Parser)]
#[command(name = "stockfeed", about = "stockfeed: daily OHLCV dataset builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars from Alpha Vantage and write one JSON file per ticker.
    Collect {
        /// Merge the last few days into existing datasets instead of
        /// re-fetching full history.
        #[arg(long, default_value_t = false)]
        update: bool,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Skip TLS certificate validation.
        #[arg(long, default_value_t = false)]
        insecure_tls: bool,
    },
    /// Convert pre-downloaded CSV exports into JSON datasets.
    Convert {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding `{TICKER}_historical_data.csv` (overrides the config).
        #[arg(long)]
        history_dir: Option<PathBuf>,

        /// Output directory (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Generate synthetic random-walk datasets for demos and testing.
    Generate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seed for reproducible output. Omit for a fresh series every run.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Collect {
            update,
            config,
            data_dir,
            insecure_tls,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            config.fetcher.accept_invalid_certs |= insecure_tls;
            run_collect(&config, update, today)
        }
        Commands::Convert {
            config,
            history_dir,
            data_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(dir) = history_dir {
                config.history_dir = dir;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            run_convert(&config)
        }
        Commands::Generate {
            config,
            data_dir,
            seed,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            run_generate(&config, seed, today)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FeedConfig> {
    match path {
        Some(path) => FeedConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(FeedConfig::default()),
    }
}

fn run_collect(config: &FeedConfig, update: bool, today: NaiveDate) -> Result<()> {
    println!("=== Alpha Vantage Data Collector ===");
    println!("Tickers: {}", config.tickers.join(", "));
    if update {
        println!("Mode:    update (last {} days)", config.update_days_back);
    } else {
        println!("Mode:    full history ({} years)", config.years_back);
    }
    println!("Delay:   {}s between requests", config.delay_secs);
    println!("Output:  {}", config.data_dir.display());
    println!("API key: {}", config.fetcher.masked_api_key());
    if config.fetcher.uses_demo_key() {
        println!();
        println!("Using the demo API key, which is heavily rate limited.");
        println!(
            "Get a free key at https://www.alphavantage.co/support/#api-key and set {}.",
            stockfeed_core::config::API_KEY_ENV
        );
    }
    if config.fetcher.accept_invalid_certs {
        eprintln!("WARNING: TLS certificate validation is disabled for this run");
    }
    println!();

    let provider = match AlphaVantageProvider::new(&config.fetcher) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(());
        }
    };
    let store = DatasetStore::new(&config.data_dir);
    match store.ensure_dir() {
        Ok(true) => println!("Created output directory {}", store.data_dir().display()),
        Ok(false) => {}
        Err(e) => eprintln!("WARNING: {e}"),
    }

    let opts = BatchOptions {
        delay: Duration::from_secs(config.delay_secs),
        today,
    };
    let progress = StdoutProgress;

    let summary = if update {
        update_all(
            &provider,
            &store,
            &config.tickers,
            config.update_days_back,
            &opts,
            &progress,
        )
    } else {
        collect_all(
            &provider,
            &store,
            &config.tickers,
            config.years_back,
            &opts,
            &progress,
        )
    };

    report_batch(&store, &summary);
    Ok(())
}

fn report_batch(store: &DatasetStore, summary: &BatchSummary) {
    for (ticker, _) in &summary.outcomes {
        if let Ok(bars) = store.load(ticker) {
            warn_anomalies(ticker, &bars);
        }
    }
    if let Some(line) = failed_tickers_line(summary) {
        println!("{line}");
    }
}

/// One-line recap of failed tickers; the errors themselves were already
/// printed as each ticker completed.
fn failed_tickers_line(summary: &BatchSummary) -> Option<String> {
    if summary.all_succeeded() {
        return None;
    }
    let failed: Vec<&str> = summary.errors.iter().map(|(t, _)| t.as_str()).collect();
    Some(format!("Failed tickers: {}", failed.join(", ")))
}

fn run_convert(config: &FeedConfig) -> Result<()> {
    let importer = CsvImporter::new(&config.history_dir);
    let store = DatasetStore::new(&config.data_dir);

    println!("=== CSV to JSON Converter ===");
    println!("History: {}", importer.history_dir().display());
    println!("Output:  {}", store.data_dir().display());
    println!();
    let total = config.tickers.len();
    let mut succeeded = 0;

    for (i, ticker) in config.tickers.iter().enumerate() {
        println!("[{}/{total}] Converting {ticker}...", i + 1);

        let report = match importer.convert(ticker) {
            Ok(report) => report,
            Err(e) => {
                println!("  FAIL: {ticker}: {e}");
                continue;
            }
        };

        println!("  Headers: {}", report.headers.join(", "));
        for row in &report.rejected {
            eprintln!("  WARNING: skipping line {} ({}): {}", row.line, row.reason, row.raw);
        }

        let Some((first, last)) = report.date_range() else {
            println!("  FAIL: {ticker}: no valid rows");
            continue;
        };

        match store.save(ticker, &report.bars) {
            Ok(path) => {
                println!(
                    "  OK: {ticker} ({} records, {first} to {last}) -> {}",
                    report.bars.len(),
                    path.display()
                );
                warn_anomalies(ticker, &report.bars);
                succeeded += 1;
            }
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    println!();
    println!(
        "Complete: {succeeded}/{total} succeeded, {} failed",
        total - succeeded
    );
    Ok(())
}

fn run_generate(config: &FeedConfig, seed: Option<u64>, today: NaiveDate) -> Result<()> {
    println!("=== Synthetic Data Generator ===");
    println!("Output: {}", config.data_dir.display());
    match seed {
        Some(seed) => println!("Seed:   {seed}"),
        None => println!("Seed:   random"),
    }
    println!();

    let store = DatasetStore::new(&config.data_dir);
    let mut rng = rng_for(seed);
    let presets = default_presets();
    let total = presets.len();
    let mut succeeded = 0;

    for (i, (ticker, params)) in presets.iter().enumerate() {
        println!("[{}/{total}] Generating {ticker}...", i + 1);

        let series = match generate(params, today, &mut rng) {
            Ok(series) => series,
            Err(e) => {
                println!("  FAIL: {ticker}: {e}");
                continue;
            }
        };
        for correction in &series.corrections {
            println!(
                "  Market correction on {}: {:.1}%",
                correction.date,
                correction.pct * 100.0
            );
        }

        match store.save(ticker, &series.bars) {
            Ok(path) => {
                println!(
                    "  OK: {ticker} ({} records) -> {}",
                    series.bars.len(),
                    path.display()
                );
                succeeded += 1;
            }
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    println!();
    println!(
        "Complete: {succeeded}/{total} succeeded, {} failed",
        total - succeeded
    );
    Ok(())
}

fn warn_anomalies(ticker: &str, bars: &[DailyBar]) {
    for anomaly in detect_anomalies(bars) {
        eprintln!("WARNING: {ticker}: {anomaly}");
    }
}
