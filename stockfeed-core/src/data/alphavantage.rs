//! Alpha Vantage data provider.
//!
//! Fetches daily OHLCV bars from the `TIME_SERIES_DAILY_ADJUSTED` endpoint.
//! The free tier allows only a handful of calls per minute, and it reports
//! quota exhaustion inside a 200 response (`Note` / `Information`) rather
//! than with an HTTP status, so the body is inspected before the series.

use super::provider::{DataError, DataProvider, FetchResult, OutputSize};
use crate::config::FetcherConfig;
use crate::domain::DailyBar;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// `TIME_SERIES_DAILY_ADJUSTED` response envelope.
///
/// Rows are kept loosely typed so a single malformed day can be skipped
/// without rejecting the whole payload.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, BTreeMap<String, Value>>>,
}

/// Alpha Vantage data provider.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageProvider {
    /// Build the provider and its HTTP client.
    ///
    /// Certificate validation stays on unless `accept_invalid_certs` is set.
    pub fn new(config: &FetcherConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.resolved_api_key(),
        })
    }

    /// Build the query URL for a ticker.
    fn query_url(base_url: &str, api_key: &str, ticker: &str, size: OutputSize) -> String {
        format!(
            "{base_url}?function=TIME_SERIES_DAILY_ADJUSTED&symbol={ticker}\
             &apikey={api_key}&outputsize={}",
            size.as_query_value()
        )
    }

    /// Map an HTTP status and raw body to bars or to the failure they signal.
    fn decode(ticker: &str, status: u16, body: &[u8]) -> Result<FetchResult, DataError> {
        if !(200..300).contains(&status) {
            return Err(DataError::HttpStatus {
                ticker: ticker.to_string(),
                status,
            });
        }

        let resp: TimeSeriesResponse = serde_json::from_slice(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;

        Self::parse_response(ticker, resp)
    }

    /// Turn a decoded response into bars, or into the failure it signals.
    fn parse_response(ticker: &str, resp: TimeSeriesResponse) -> Result<FetchResult, DataError> {
        if let Some(message) = resp.error_message {
            return Err(DataError::Api(message));
        }
        if let Some(note) = resp.note.or(resp.information) {
            return Err(DataError::RateLimited(note));
        }

        let series = resp.time_series.ok_or_else(|| DataError::MissingTimeSeries {
            ticker: ticker.to_string(),
        })?;

        let mut bars = Vec::with_capacity(series.len());
        let mut skipped_rows = 0;

        for (date, fields) in &series {
            match parse_row(date, fields) {
                Ok(bar) => bars.push(bar),
                Err(_) => skipped_rows += 1,
            }
        }

        Ok(FetchResult {
            ticker: ticker.to_string(),
            bars,
            skipped_rows,
        })
    }
}

/// Parse one `"YYYY-MM-DD" -> {"1. open": "...", ...}` entry.
fn parse_row(date: &str, fields: &BTreeMap<String, Value>) -> Result<DailyBar, DataError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("bad date '{date}': {e}")))?;

    let bar = DailyBar {
        date,
        open: price_field(fields, "1. open")?,
        high: price_field(fields, "2. high")?,
        low: price_field(fields, "3. low")?,
        close: price_field(fields, "4. close")?,
        volume: volume_field(fields, "6. volume")?,
    };
    Ok(bar.rounded())
}

fn price_field(fields: &BTreeMap<String, Value>, key: &str) -> Result<f64, DataError> {
    let value = fields
        .get(key)
        .ok_or_else(|| DataError::Parse(format!("missing field '{key}'")))?;
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::Parse(format!("bad number in '{key}': {value}")))
}

fn volume_field(fields: &BTreeMap<String, Value>, key: &str) -> Result<u64, DataError> {
    let value = fields
        .get(key)
        .ok_or_else(|| DataError::Parse(format!("missing field '{key}'")))?;
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataError::Parse(format!("bad volume in '{key}': {value}")))
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(&self, ticker: &str, size: OutputSize) -> Result<FetchResult, DataError> {
        let url = Self::query_url(&self.base_url, &self.api_key, ticker, size);

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(|e| {
            DataError::NetworkUnreachable(format!("reading body for {ticker}: {e}"))
        })?;

        Self::decode(ticker, status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ticker: &str, body: &str) -> Result<FetchResult, DataError> {
        let resp: TimeSeriesResponse = serde_json::from_str(body).unwrap();
        AlphaVantageProvider::parse_response(ticker, resp)
    }

    const SAMPLE: &str = r#"{
        "Meta Data": {"1. Information": "Daily Time Series", "2. Symbol": "QQQ"},
        "Time Series (Daily)": {
            "2024-01-03": {
                "1. open": "402.1000", "2. high": "405.5060", "3. low": "399.8000",
                "4. close": "404.2500", "5. adjusted close": "403.1", "6. volume": "51234567",
                "7. dividend amount": "0.0000", "8. split coefficient": "1.0"
            },
            "2024-01-02": {
                "1. open": "400.0000", "2. high": "403.0000", "3. low": "398.0000",
                "4. close": "401.0000", "5. adjusted close": "400.1", "6. volume": "49000000",
                "7. dividend amount": "0.0000", "8. split coefficient": "1.0"
            }
        }
    }"#;

    #[test]
    fn query_url_carries_all_parameters() {
        let url = AlphaVantageProvider::query_url(
            "https://www.alphavantage.co/query",
            "demo",
            "QQQ",
            OutputSize::Compact,
        );
        assert_eq!(
            url,
            "https://www.alphavantage.co/query?function=TIME_SERIES_DAILY_ADJUSTED\
             &symbol=QQQ&apikey=demo&outputsize=compact"
        );
    }

    #[test]
    fn parses_numbered_fields() {
        let result = parse("QQQ", SAMPLE).unwrap();
        assert_eq!(result.bars.len(), 2);
        assert_eq!(result.skipped_rows, 0);

        let jan3 = result
            .bars
            .iter()
            .find(|b| b.date == NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .unwrap();
        assert_eq!(jan3.open, 402.1);
        assert_eq!(jan3.high, 405.51);
        assert_eq!(jan3.low, 399.8);
        assert_eq!(jan3.close, 404.25);
        assert_eq!(jan3.volume, 51_234_567);
    }

    #[test]
    fn error_message_is_an_api_error() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        assert!(matches!(parse("NOPE", body), Err(DataError::Api(m)) if m == "Invalid API call."));
    }

    #[test]
    fn note_is_a_rate_limit() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        assert!(matches!(parse("QQQ", body), Err(DataError::RateLimited(_))));
    }

    #[test]
    fn information_is_a_rate_limit() {
        let body = r#"{"Information": "We have detected your API key as demo."}"#;
        assert!(matches!(parse("QQQ", body), Err(DataError::RateLimited(_))));
    }

    #[test]
    fn missing_series_is_reported() {
        let body = r#"{"Meta Data": {}}"#;
        match parse("QQQ", body) {
            Err(DataError::MissingTimeSeries { ticker }) => assert_eq!(ticker, "QQQ"),
            other => panic!("expected MissingTimeSeries, got {other:?}"),
        }
    }

    #[test]
    fn decode_accepts_a_normal_payload() {
        let result = AlphaVantageProvider::decode("QQQ", 200, SAMPLE.as_bytes()).unwrap();
        assert_eq!(result.ticker, "QQQ");
        assert_eq!(result.bars.len(), 2);
    }

    #[test]
    fn decode_maps_server_error_to_http_status() {
        match AlphaVantageProvider::decode("QQQ", 500, b"Internal Server Error") {
            Err(DataError::HttpStatus { ticker, status }) => {
                assert_eq!(ticker, "QQQ");
                assert_eq!(status, 500);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[test]
    fn decode_checks_status_before_body() {
        // a JSON error payload on a 503 is still an HTTP failure
        let body = br#"{"Error Message": "Invalid API call."}"#;
        assert!(matches!(
            AlphaVantageProvider::decode("QQQ", 503, body),
            Err(DataError::HttpStatus { status: 503, .. })
        ));
    }

    #[test]
    fn decode_rejects_html_on_success() {
        let body = b"<html><body>Service temporarily unavailable</body></html>";
        assert!(matches!(
            AlphaVantageProvider::decode("QQQ", 200, body),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let body = r#"{
            "Time Series (Daily)": {
                "2024-01-02": {"1. open": "1", "2. high": "2", "3. low": "0.5", "4. close": "1.5", "6. volume": "10"},
                "2024-01-03": {"1. open": "abc", "2. high": "2", "3. low": "0.5", "4. close": "1.5", "6. volume": "10"},
                "2024-01-04": {"1. open": "1", "2. high": "2", "3. low": "0.5", "4. close": "1.5"},
                "not-a-date": {"1. open": "1", "2. high": "2", "3. low": "0.5", "4. close": "1.5", "6. volume": "10"}
            }
        }"#;
        let result = parse("QQQ", body).unwrap();
        assert_eq!(result.bars.len(), 1);
        assert_eq!(result.skipped_rows, 3);
    }
}
