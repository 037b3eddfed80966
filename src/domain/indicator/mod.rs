//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every indicator is causal: the point at index `i` only reads bars `0..=i`.
//! Points that cannot be computed yet (warm-up, degenerate windows) are marked
//! invalid instead of carrying a made-up number.

pub mod bollinger;
pub mod ema;
pub mod frame;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::calculate_band_position;
pub use ema::calculate_ema;
pub use frame::{compute_indicators, IndicatorFrame};
pub use macd::calculate_macd_line;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn valid(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            valid: true,
            value,
        }
    }

    pub fn invalid(date: NaiveDate) -> Self {
        Self {
            date,
            valid: false,
            value: 0.0,
        }
    }

    /// Builds a point that is valid only when `value` is present and finite.
    pub fn from_option(date: NaiveDate, value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::valid(date, v),
            _ => Self::invalid(date),
        }
    }

    pub fn get(&self) -> Option<f64> {
        if self.valid { Some(self.value) } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Roc(usize),
    Stddev(usize),
    MacdLine { fast: usize, slow: usize },
    BandPosition { period: usize, stddev_mult_x100: u32 },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Column view: `Some(value)` for valid points, `None` otherwise.
    pub fn to_options(&self) -> Vec<Option<f64>> {
        self.values.iter().map(IndicatorPoint::get).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::MacdLine { fast, slow } => write!(f, "MACD({},{})", fast, slow),
            IndicatorType::BandPosition {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BB_POSITION({},{})", period, mult)
            }
        }
    }
}
