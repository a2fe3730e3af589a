//! Collection orchestrator: full-history collection and incremental
//! updates across a ticker list, paced to the provider's per-minute quota.
//!
//! Failures never abort a batch: each ticker either succeeds or is recorded
//! with its error and skipped. There is no retry.

use super::canonicalize::{canonicalize, merge_new};
use super::provider::{DataError, DataProvider, FeedProgress, OutputSize, TickerOutcome};
use super::store::DatasetStore;
use crate::domain::DailyBar;
use chrono::{Duration, NaiveDate};

/// Oldest date excluded by a `days` window ending `today`.
///
/// Bars dated on or before the cutoff are dropped; the window is
/// `(today - days, today]`.
pub fn cutoff_date(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days)
}

/// Fetch full history for a ticker, keeping the last `years_back * 365` days.
///
/// Returns bars sorted ascending by date; an empty window is `NoData`.
pub fn fetch_history(
    provider: &dyn DataProvider,
    ticker: &str,
    years_back: u32,
    today: NaiveDate,
) -> Result<Vec<DailyBar>, DataError> {
    fetch_window(
        provider,
        ticker,
        OutputSize::Full,
        i64::from(years_back) * 365,
        today,
    )
}

/// Fetch the compact (recent-only) series, keeping the last `days_back` days.
pub fn fetch_recent(
    provider: &dyn DataProvider,
    ticker: &str,
    days_back: u32,
    today: NaiveDate,
) -> Result<Vec<DailyBar>, DataError> {
    fetch_window(
        provider,
        ticker,
        OutputSize::Compact,
        i64::from(days_back),
        today,
    )
}

fn fetch_window(
    provider: &dyn DataProvider,
    ticker: &str,
    size: OutputSize,
    days: i64,
    today: NaiveDate,
) -> Result<Vec<DailyBar>, DataError> {
    let fetched = provider.fetch(ticker, size)?;
    if fetched.skipped_rows > 0 {
        eprintln!(
            "WARNING: {} returned {} malformed row(s) for {}; skipped",
            provider.name(),
            fetched.skipped_rows,
            fetched.ticker
        );
    }

    let cutoff = cutoff_date(today, days);
    let bars: Vec<DailyBar> = fetched
        .bars
        .into_iter()
        .filter(|b| b.date > cutoff)
        .collect();

    if bars.is_empty() {
        return Err(DataError::NoData {
            ticker: ticker.to_string(),
        });
    }

    Ok(canonicalize(bars))
}

/// Collect full history for one ticker and write its dataset.
pub fn collect_ticker(
    provider: &dyn DataProvider,
    store: &DatasetStore,
    ticker: &str,
    years_back: u32,
    today: NaiveDate,
) -> Result<TickerOutcome, DataError> {
    let bars = fetch_history(provider, ticker, years_back, today)?;
    store.save(ticker, &bars)?;
    Ok(TickerOutcome::Collected {
        records: bars.len(),
    })
}

/// Merge the recent window into the ticker's existing dataset.
///
/// A missing dataset is treated as empty. The file is rewritten whole;
/// it is left untouched when the fetch fails or returns nothing recent.
pub fn update_ticker(
    provider: &dyn DataProvider,
    store: &DatasetStore,
    ticker: &str,
    days_back: u32,
    today: NaiveDate,
) -> Result<TickerOutcome, DataError> {
    let existing = store.load_or_empty(ticker)?;
    let recent = fetch_recent(provider, ticker, days_back, today)?;

    let merged = merge_new(existing, recent);
    store.save(ticker, &merged.bars)?;

    Ok(TickerOutcome::Updated {
        added: merged.added,
        total: merged.bars.len(),
    })
}

/// Options shared by batch runs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause before every network call except the first.
    pub delay: std::time::Duration,
    /// Reference date for the history/update windows.
    pub today: NaiveDate,
}

/// Collect full history for every ticker.
pub fn collect_all(
    provider: &dyn DataProvider,
    store: &DatasetStore,
    tickers: &[String],
    years_back: u32,
    opts: &BatchOptions,
    progress: &dyn FeedProgress,
) -> BatchSummary {
    run_batch(tickers, opts, progress, |ticker| {
        collect_ticker(provider, store, ticker, years_back, opts.today)
    })
}

/// Incrementally update every ticker.
pub fn update_all(
    provider: &dyn DataProvider,
    store: &DatasetStore,
    tickers: &[String],
    days_back: u32,
    opts: &BatchOptions,
    progress: &dyn FeedProgress,
) -> BatchSummary {
    run_batch(tickers, opts, progress, |ticker| {
        update_ticker(provider, store, ticker, days_back, opts.today)
    })
}

fn run_batch(
    tickers: &[String],
    opts: &BatchOptions,
    progress: &dyn FeedProgress,
    mut process: impl FnMut(&str) -> Result<TickerOutcome, DataError>,
) -> BatchSummary {
    let total = tickers.len();
    let mut outcomes: Vec<(String, TickerOutcome)> = Vec::new();
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        if i > 0 {
            progress.on_wait(opts.delay);
            if !opts.delay.is_zero() {
                std::thread::sleep(opts.delay);
            }
        }

        progress.on_start(ticker, i, total);
        let result = process(ticker);
        progress.on_complete(ticker, i, total, &result);

        match result {
            Ok(outcome) => outcomes.push((ticker.clone(), outcome)),
            Err(e) => errors.push((ticker.clone(), e)),
        }
    }

    let summary = BatchSummary {
        total,
        outcomes,
        errors,
    };
    progress.on_batch_complete(summary.succeeded(), summary.failed(), total);
    summary
}

/// Summary of a batch operation.
#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    pub outcomes: Vec<(String, TickerOutcome)>,
    pub errors: Vec<(String, DataError)>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::FetchResult;

    /// Returns a fixed batch with a fixed count of dropped rows.
    struct PartialProvider {
        bars: Vec<DailyBar>,
        skipped_rows: usize,
    }

    impl DataProvider for PartialProvider {
        fn name(&self) -> &str {
            "partial"
        }

        fn fetch(&self, ticker: &str, _size: OutputSize) -> Result<FetchResult, DataError> {
            Ok(FetchResult {
                ticker: ticker.to_string(),
                bars: self.bars.clone(),
                skipped_rows: self.skipped_rows,
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn bar(days_ago: i64) -> DailyBar {
        DailyBar {
            date: today() - Duration::days(days_ago),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100,
        }
    }

    #[test]
    fn cutoff_day_is_excluded() {
        assert_eq!(cutoff_date(today(), 7), NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());

        let provider = PartialProvider {
            bars: vec![bar(7), bar(6)],
            skipped_rows: 0,
        };
        let bars = fetch_recent(&provider, "QQQ", 7, today()).unwrap();
        assert_eq!(bars, vec![bar(6)]);
    }

    #[test]
    fn skipped_rows_do_not_drop_good_ones() {
        let provider = PartialProvider {
            bars: vec![bar(1), bar(3), bar(2)],
            skipped_rows: 2,
        };

        let bars = fetch_history(&provider, "VOO", 2, today()).unwrap();

        assert_eq!(bars, vec![bar(3), bar(2), bar(1)]);
    }

    #[test]
    fn only_skipped_rows_is_no_data() {
        let provider = PartialProvider {
            bars: Vec::new(),
            skipped_rows: 4,
        };

        let result = fetch_history(&provider, "SOXX", 2, today());
        assert!(matches!(result, Err(DataError::NoData { ticker }) if ticker == "SOXX"));
    }
}
