//! JSON dataset store.
//!
//! Layout: `{data_dir}/{TICKER}.json`, one pretty-printed array of
//! `DailyBar` per ticker, ascending by date.
//!
//! Writes go to `{TICKER}.json.tmp` and are renamed into place, so a reader
//! never sees a half-written file. There is no locking: two runs writing the
//! same ticker race, and the last rename wins.

use super::provider::DataError;
use crate::domain::DailyBar;
use std::fs;
use std::path::{Path, PathBuf};

/// The on-disk dataset directory.
pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the dataset for a ticker: `{data_dir}/{TICKER}.json`
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{ticker}.json"))
    }

    pub fn exists(&self, ticker: &str) -> bool {
        self.path_for(ticker).is_file()
    }

    /// Create the data directory if needed. Returns true if it was created.
    pub fn ensure_dir(&self) -> Result<bool, DataError> {
        if self.data_dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| DataError::StoreError(format!("failed to create dir: {e}")))?;
        Ok(true)
    }

    /// Load the dataset for a ticker, in file order.
    pub fn load(&self, ticker: &str) -> Result<Vec<DailyBar>, DataError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(DataError::NoDataset {
                ticker: ticker.to_string(),
            });
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DataError::StoreError(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| DataError::StoreError(format!("corrupt dataset {}: {e}", path.display())))
    }

    /// Load the dataset for a ticker, or an empty one if none exists yet.
    pub fn load_or_empty(&self, ticker: &str) -> Result<Vec<DailyBar>, DataError> {
        match self.load(ticker) {
            Err(DataError::NoDataset { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Replace the dataset for a ticker. Returns the path written.
    pub fn save(&self, ticker: &str, bars: &[DailyBar]) -> Result<PathBuf, DataError> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(bars)
            .map_err(|e| DataError::StoreError(format!("dataset serialization: {e}")))?;

        let path = self.path_for(ticker);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .map_err(|e| DataError::StoreError(format!("write {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::StoreError(format!("atomic rename failed: {e}"))
        })?;

        Ok(path)
    }
}
