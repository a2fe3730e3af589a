//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over remote time-series sources so the
//! collection loop can be driven by a mock in tests. The store sits beside
//! this trait; providers don't know about files on disk.

use crate::domain::DailyBar;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Every variant degrades to "skip this ticker" or "skip this row" at the
/// call site; none of them is fatal to a run.
#[derive(Debug, Error)]
pub enum DataError {
    // transport
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {ticker}")]
    HttpStatus { ticker: String, status: u16 },

    // API-semantic
    #[error("API error: {0}")]
    Api(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("no time series data found for {ticker}")]
    MissingTimeSeries { ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no data found for {ticker}")]
    NoData { ticker: String },

    // record-level
    #[error("parse error: {0}")]
    Parse(String),

    // filesystem
    #[error("CSV file not found: {}", path.display())]
    CsvNotFound { path: PathBuf },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("no dataset for ticker '{ticker}'")]
    NoDataset { ticker: String },

    #[error("store error: {0}")]
    StoreError(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// How much history to request from a remote time-series endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    /// Full available history.
    Full,
    /// Recent window only (roughly the latest 100 trading days).
    Compact,
}

impl OutputSize {
    pub fn as_query_value(self) -> &'static str {
        match self {
            OutputSize::Full => "full",
            OutputSize::Compact => "compact",
        }
    }
}

/// Result of a successful fetch for a single ticker.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub ticker: String,
    /// Parsed bars, in whatever order the provider returned them.
    pub bars: Vec<DailyBar>,
    /// Rows present in the response but dropped as malformed.
    pub skipped_rows: usize,
}

/// Trait for remote daily time-series providers.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a ticker.
    fn fetch(&self, ticker: &str, size: OutputSize) -> Result<FetchResult, DataError>;
}

/// What happened to one ticker in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerOutcome {
    /// Full history written.
    Collected { records: usize },
    /// Recent window merged into the existing dataset.
    Updated { added: usize, total: usize },
}

/// Progress callback for multi-ticker operations.
pub trait FeedProgress: Send {
    /// Called when starting to fetch a ticker.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called before sleeping between two network calls.
    fn on_wait(&self, delay: Duration);

    /// Called when a ticker completes.
    fn on_complete(
        &self,
        ticker: &str,
        index: usize,
        total: usize,
        result: &Result<TickerOutcome, DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FeedProgress for StdoutProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {ticker}...", index + 1, total);
    }

    fn on_wait(&self, delay: Duration) {
        println!(
            "  waiting {}s to stay under the API rate limit...",
            delay.as_secs()
        );
    }

    fn on_complete(
        &self,
        ticker: &str,
        _index: usize,
        _total: usize,
        result: &Result<TickerOutcome, DataError>,
    ) {
        match result {
            Ok(TickerOutcome::Collected { records }) => {
                println!("  OK: {ticker} ({records} records)")
            }
            Ok(TickerOutcome::Updated { added, total }) => {
                println!("  OK: {ticker} (added {added} new records, total {total})")
            }
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nComplete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
