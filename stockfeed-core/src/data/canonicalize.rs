//! Ordering, deduplication and merging of bar sequences.
//!
//! Every dataset written to disk goes through `canonicalize` or
//! `merge_new`, which is what guarantees strictly ascending, unique dates.

use crate::domain::DailyBar;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Sort ascending by date and drop repeated dates (first occurrence wins).
pub fn canonicalize(mut bars: Vec<DailyBar>) -> Vec<DailyBar> {
    // stable: among equal dates the earlier input keeps its place
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}

/// Result of merging a fresh batch into an existing dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub bars: Vec<DailyBar>,
    /// How many incoming bars were new.
    pub added: usize,
}

/// Append incoming bars whose date is not already present, then re-sort.
///
/// Existing bars are never replaced. Repeating the same incoming batch adds
/// nothing the second time.
pub fn merge_new(existing: Vec<DailyBar>, incoming: Vec<DailyBar>) -> MergeOutcome {
    let mut seen: HashSet<NaiveDate> = existing.iter().map(|b| b.date).collect();
    let mut bars = existing;
    let mut added = 0;

    for bar in incoming {
        if seen.insert(bar.date) {
            bars.push(bar);
            added += 1;
        }
    }

    bars.sort_by_key(|b| b.date);
    MergeOutcome { bars, added }
}

/// True if dates are strictly ascending (sorted and unique).
pub fn is_canonical(bars: &[DailyBar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}

/// Detect suspicious bars (warnings only, nothing is removed).
pub fn detect_anomalies(bars: &[DailyBar]) -> Vec<AnomalyReport> {
    let mut anomalies = Vec::new();

    let zero_volume_count = bars.iter().filter(|b| b.volume == 0).count();
    if zero_volume_count > 0 {
        anomalies.push(AnomalyReport {
            anomaly_type: AnomalyType::ZeroVolume,
            count: zero_volume_count,
        });
    }

    let inconsistent_count = bars.iter().filter(|b| !b.is_consistent()).count();
    if inconsistent_count > 0 {
        anomalies.push(AnomalyReport {
            anomaly_type: AnomalyType::InconsistentOhlc,
            count: inconsistent_count,
        });
    }

    anomalies
}

#[derive(Debug)]
pub struct AnomalyReport {
    pub anomaly_type: AnomalyType,
    pub count: usize,
}

impl std::fmt::Display for AnomalyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.anomaly_type {
            AnomalyType::ZeroVolume => "bar(s) with zero volume",
            AnomalyType::InconsistentOhlc => "bar(s) outside low <= open,close <= high",
        };
        write!(f, "{} {what}", self.count)
    }
}

#[derive(Debug, PartialEq)]
pub enum AnomalyType {
    ZeroVolume,
    InconsistentOhlc,
}
