//! stockfeed core: daily OHLCV datasets for a fixed ticker list.
//!
//! Three independent producers write the same `{TICKER}.json` shape into the
//! same data directory:
//! - Live fetcher: Alpha Vantage daily time series, full history or an
//!   incremental update merged by date
//! - CSV importer: pre-downloaded historical exports
//! - Synthetic generator: random-walk demo data
//!
//! Everything runs sequentially; the only timing control is the fixed pause
//! between successive API calls.

pub mod config;
pub mod data;
pub mod domain;

pub use config::{ConfigError, FeedConfig, FetcherConfig};
pub use domain::DailyBar;
