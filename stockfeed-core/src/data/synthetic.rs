//! Synthetic random-walk bars for demos and test fixtures.
//!
//! One bar per weekday (no holiday calendar) from `today - years*365` to
//! `today`. Daily returns are Gaussian with mean `annual_trend / 252` and
//! standard deviation `daily_volatility`; volume is log-normal around
//! 5,000,000; with probability 0.5% per trading day the price takes an
//! extra one-off 5–15% drop (a "market correction").
//!
//! The caller supplies the RNG: entropy-seeded for ordinary runs, seeded
//! for reproducible output.

use super::provider::DataError;
use crate::domain::DailyBar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

/// Approximate trading days per year, used to turn an annual trend into a daily drift.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const BASE_VOLUME: f64 = 5_000_000.0;
const VOLUME_LOG_SIGMA: f64 = 0.5;
const CORRECTION_PROBABILITY: f64 = 0.005;
const CORRECTION_RANGE: std::ops::Range<f64> = -0.15..-0.05;

/// Parameters of one synthetic series.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorParams {
    pub start_price: f64,
    /// Standard deviation of the daily return (0.015 = 1.5%).
    pub daily_volatility: f64,
    /// Expected yearly return (0.15 = 15%).
    pub annual_trend: f64,
    pub years: u32,
}

impl GeneratorParams {
    pub fn validate(&self) -> Result<(), DataError> {
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(DataError::InvalidParameters(format!(
                "start price must be positive, got {}",
                self.start_price
            )));
        }
        if !(self.daily_volatility.is_finite() && self.daily_volatility >= 0.0) {
            return Err(DataError::InvalidParameters(format!(
                "daily volatility must be non-negative, got {}",
                self.daily_volatility
            )));
        }
        if !self.annual_trend.is_finite() {
            return Err(DataError::InvalidParameters("annual trend must be finite".into()));
        }
        if self.years == 0 {
            return Err(DataError::InvalidParameters("years must be at least 1".into()));
        }
        Ok(())
    }
}

/// The demo tickers and their profiles.
pub fn default_presets() -> Vec<(&'static str, GeneratorParams)> {
    vec![
        // Nasdaq-100: high volatility, strong uptrend
        (
            "QQQ",
            GeneratorParams {
                start_price: 400.0,
                daily_volatility: 0.015,
                annual_trend: 0.15,
                years: 2,
            },
        ),
        // S&P 500: moderate volatility, steady uptrend
        (
            "VOO",
            GeneratorParams {
                start_price: 400.0,
                daily_volatility: 0.012,
                annual_trend: 0.10,
                years: 2,
            },
        ),
        // Semiconductors: highest volatility, growth
        (
            "SOXX",
            GeneratorParams {
                start_price: 400.0,
                daily_volatility: 0.018,
                annual_trend: 0.18,
                years: 2,
            },
        ),
    ]
}

/// A one-off drop applied after the close of `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketCorrection {
    pub date: NaiveDate,
    /// Fractional change, in `[-0.15, -0.05)`.
    pub pct: f64,
}

#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    pub bars: Vec<DailyBar>,
    pub corrections: Vec<MarketCorrection>,
}

/// RNG for a generator run: seeded when reproducible output is wanted.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, DataError> {
    Normal::new(mean, std_dev).map_err(|e| DataError::InvalidParameters(e.to_string()))
}

/// Generate a synthetic series ending `today`.
///
/// Bars come out in ascending date order. Every bar satisfies
/// `low <= min(open, close)`, `high >= max(open, close)` and `volume >= 1`.
pub fn generate<R: Rng>(
    params: &GeneratorParams,
    today: NaiveDate,
    rng: &mut R,
) -> Result<SyntheticSeries, DataError> {
    params.validate()?;

    let daily_return = normal(
        params.annual_trend / TRADING_DAYS_PER_YEAR,
        params.daily_volatility,
    )?;
    let open_noise = normal(0.0, params.daily_volatility / 2.0)?;
    let volume_noise = normal(0.0, VOLUME_LOG_SIGMA)?;

    let start = today - Duration::days(i64::from(params.years) * 365);
    let mut bars = Vec::new();
    let mut corrections = Vec::new();
    let mut price = params.start_price;
    let mut current = start;

    while current <= today {
        if is_weekday(current) {
            price *= 1.0 + daily_return.sample(rng);

            // intraday range scales with price and a random activity factor
            let intraday_vol = price.abs() * params.daily_volatility * rng.gen_range(0.5..1.5);

            let open = price * (1.0 + open_noise.sample(rng));
            let close = price;
            let high_wick: f64 = rng.sample(StandardNormal);
            let low_wick: f64 = rng.sample(StandardNormal);
            let high = open.max(close) + (intraday_vol * high_wick).abs();
            let low = open.min(close) - (intraday_vol * low_wick).abs();

            let volume = (BASE_VOLUME * volume_noise.sample(rng).exp()) as u64;

            bars.push(
                DailyBar {
                    date: current,
                    open,
                    high,
                    low,
                    close,
                    volume: volume.max(1),
                }
                .rounded(),
            );

            if rng.gen::<f64>() < CORRECTION_PROBABILITY {
                let pct = rng.gen_range(CORRECTION_RANGE);
                price *= 1.0 + pct;
                corrections.push(MarketCorrection { date: current, pct });
            }
        }
        current += Duration::days(1);
    }

    Ok(SyntheticSeries { bars, corrections })
}
