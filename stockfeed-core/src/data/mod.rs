//! Dataset producers and persistence

pub mod alphavantage;
pub mod canonicalize;
pub mod collect;
pub mod csv_import;
pub mod provider;
pub mod store;
pub mod synthetic;

pub use alphavantage::AlphaVantageProvider;
pub use canonicalize::{canonicalize, detect_anomalies, is_canonical, merge_new, MergeOutcome};
pub use collect::{collect_all, update_all, BatchOptions, BatchSummary};
pub use csv_import::{CsvImporter, ImportReport, RejectedRow};
pub use provider::{
    DataError, DataProvider, FeedProgress, FetchResult, OutputSize, StdoutProgress,
    TickerOutcome,
};
pub use store::DatasetStore;
pub use synthetic::{default_presets, generate, rng_for, GeneratorParams, SyntheticSeries};
