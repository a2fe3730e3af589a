//! CSV import for pre-downloaded historical exports.
//!
//! Input: `{history_dir}/{TICKER}_historical_data.csv`, UTF-8 with an
//! optional byte-order mark, one header row, columns
//! `date, close, open, high, low, volume, ...` (close comes before open in
//! these exports; trailing columns such as change % are ignored).
//!
//! A row that fails to parse is recorded and skipped; the rest of the file
//! is still imported.

use super::canonicalize::canonicalize;
use super::provider::DataError;
use crate::domain::DailyBar;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_COL: usize = 0;
const CLOSE_COL: usize = 1;
const OPEN_COL: usize = 2;
const HIGH_COL: usize = 3;
const LOW_COL: usize = 4;
const VOLUME_COL: usize = 5;

/// Parse a volume such as `"80.09M"`, `"12K"`, `"1.2B"` or `"1,234"`.
///
/// The decimal mantissa is scaled digit by digit, so `"80.09M"` is exactly
/// 80,090,000; any fraction left after scaling is truncated.
pub fn parse_volume(text: &str) -> Result<u64, DataError> {
    let cleaned = text.trim().to_ascii_uppercase().replace(',', "");
    let (number, multiplier) = match cleaned.strip_suffix('K') {
        Some(n) => (n, 1_000),
        None => match cleaned.strip_suffix('M') {
            Some(n) => (n, 1_000_000),
            None => match cleaned.strip_suffix('B') {
                Some(n) => (n, 1_000_000_000),
                None => (cleaned.as_str(), 1),
            },
        },
    };

    scale_decimal(number.trim(), multiplier)
        .ok_or_else(|| DataError::Parse(format!("bad volume '{text}'")))
}

/// `digits[.digits] * multiplier`, truncated, or None on malformed input/overflow.
fn scale_decimal(number: &str, multiplier: u64) -> Option<u64> {
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut scaled = whole.checked_mul(multiplier)?;

    let mut place = multiplier;
    for digit in frac_part.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        scaled = scaled.checked_add(u64::from(digit - b'0') * place)?;
    }
    Some(scaled)
}

/// Parse a price, ignoring thousands separators.
pub fn parse_price(text: &str) -> Result<f64, DataError> {
    text.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::Parse(format!("bad price '{text}'")))
}

/// Parse a date, tolerating embedded whitespace (`"2025- 11- 14"`).
pub fn parse_date(text: &str) -> Result<NaiveDate, DataError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("bad date '{text}': {e}")))
}

/// A data row that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based line number in the file.
    pub line: u64,
    pub raw: String,
    pub reason: String,
}

/// Outcome of importing one CSV export.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Header names, trimmed of whitespace and quotes.
    pub headers: Vec<String>,
    /// Imported bars, ascending by date.
    pub bars: Vec<DailyBar>,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.bars.first()?.date, self.bars.last()?.date))
    }
}

/// Reads `{TICKER}_historical_data.csv` files from a history directory.
pub struct CsvImporter {
    history_dir: PathBuf,
}

impl CsvImporter {
    pub fn new(history_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_dir: history_dir.into(),
        }
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Path to the export for a ticker.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.history_dir.join(format!("{ticker}_historical_data.csv"))
    }

    /// Import the export for a ticker.
    pub fn convert(&self, ticker: &str) -> Result<ImportReport, DataError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(DataError::CsvNotFound { path });
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DataError::Csv(format!("read {}: {e}", path.display())))?;
        parse_export(&content)
    }
}

/// Parse the full text of an export.
pub fn parse_export(content: &str) -> Result<ImportReport, DataError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::Csv(format!("header row: {e}")))?
        .iter()
        .map(|h| h.trim().trim_matches('"').trim().to_string())
        .collect();

    let mut bars = Vec::new();
    let mut rejected = Vec::new();

    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let fallback_line = i as u64 + 2;
        match record {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                match parse_record(&record) {
                    Ok(bar) => bars.push(bar),
                    Err(e) => rejected.push(RejectedRow {
                        line,
                        raw: record.iter().collect::<Vec<_>>().join(","),
                        reason: e.to_string(),
                    }),
                }
            }
            Err(e) => rejected.push(RejectedRow {
                line: fallback_line,
                raw: String::new(),
                reason: e.to_string(),
            }),
        }
    }

    Ok(ImportReport {
        headers,
        bars: canonicalize(bars),
        rejected,
    })
}

fn parse_record(record: &csv::StringRecord) -> Result<DailyBar, DataError> {
    let field = |idx: usize| {
        record.get(idx).ok_or_else(|| {
            DataError::Parse(format!(
                "expected at least {} columns, got {}",
                VOLUME_COL + 1,
                record.len()
            ))
        })
    };

    let bar = DailyBar {
        date: parse_date(field(DATE_COL)?)?,
        open: parse_price(field(OPEN_COL)?)?,
        high: parse_price(field(HIGH_COL)?)?,
        low: parse_price(field(LOW_COL)?)?,
        close: parse_price(field(CLOSE_COL)?)?,
        volume: parse_volume(field(VOLUME_COL)?)?,
    };
    Ok(bar.rounded())
}
