//! Property tests for dataset invariants.
//!
//! Uses proptest to verify:
//! 1. Ordering: canonicalized and merged datasets have strictly ascending, unique dates
//! 2. Merge idempotence: merging the same batch twice equals merging it once
//! 3. Store round-trip: save then load returns the identical sequence
//! 4. Volume parsing: suffixed volumes scale exactly

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stockfeed_core::data::csv_import::parse_volume;
use stockfeed_core::data::{canonicalize, is_canonical, merge_new, DatasetStore};
use stockfeed_core::domain::{round2, DailyBar};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(round2)
}

fn arb_bar() -> impl Strategy<Value = DailyBar> {
    (0i64..60, arb_price(), 0u64..10_000_000).prop_map(|(offset, close, volume)| DailyBar {
        date: base_date() + Duration::days(offset),
        open: close,
        high: close,
        low: close,
        close,
        volume,
    })
}

fn arb_bars() -> impl Strategy<Value = Vec<DailyBar>> {
    prop::collection::vec(arb_bar(), 0..40)
}

// ── 1. Ordering ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn canonicalize_is_sorted_and_unique(bars in arb_bars()) {
        let mut dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        dates.sort();
        dates.dedup();

        let out = canonicalize(bars);
        prop_assert!(is_canonical(&out));
        prop_assert_eq!(out.iter().map(|b| b.date).collect::<Vec<_>>(), dates);
    }

    #[test]
    fn canonicalize_is_idempotent(bars in arb_bars()) {
        let once = canonicalize(bars);
        let twice = canonicalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_output_is_canonical(existing in arb_bars(), incoming in arb_bars()) {
        let existing = canonicalize(existing);
        let before = existing.len();

        let outcome = merge_new(existing, incoming);
        prop_assert!(is_canonical(&outcome.bars));
        prop_assert_eq!(outcome.bars.len(), before + outcome.added);
    }
}

// ── 2. Merge idempotence ─────────────────────────────────────────────

proptest! {
    #[test]
    fn merging_twice_equals_merging_once(existing in arb_bars(), incoming in arb_bars()) {
        let once = merge_new(canonicalize(existing), incoming.clone());
        let twice = merge_new(once.bars.clone(), incoming);

        prop_assert_eq!(twice.added, 0);
        prop_assert_eq!(twice.bars, once.bars);
    }

    #[test]
    fn merge_never_replaces_existing_bars(existing in arb_bars(), incoming in arb_bars()) {
        let existing = canonicalize(existing);
        let outcome = merge_new(existing.clone(), incoming);

        for bar in &existing {
            prop_assert!(outcome.bars.contains(bar));
        }
    }
}

// ── 3. Store round-trip ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn store_round_trip_preserves_order(bars in arb_bars()) {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let bars = canonicalize(bars);

        store.save("QQQ", &bars).unwrap();
        prop_assert_eq!(store.load("QQQ").unwrap(), bars);
    }
}

// ── 4. Volume parsing ────────────────────────────────────────────────

proptest! {
    #[test]
    fn suffixed_volume_scales_exactly(whole in 0u64..10_000, cents in 0u64..100) {
        let text = format!("{whole}.{cents:02}M");
        prop_assert_eq!(parse_volume(&text).unwrap(), whole * 1_000_000 + cents * 10_000);
    }

    #[test]
    fn thousands_separators_are_ignored(n in 0u64..1_000_000_000) {
        let digits = n.to_string();
        let mut grouped = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        prop_assert_eq!(parse_volume(&grouped).unwrap(), n);
    }
}
