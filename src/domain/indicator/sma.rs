//! Simple Moving Average of closing price.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{rolling_mean, to_column};
use crate::domain::ohlcv::OhlcvBar;

pub const SHORT_PERIOD: usize = 20;
pub const LONG_PERIOD: usize = 50;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let means = rolling_mean(&to_column(&closes), period);

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: bars
            .iter()
            .zip(means)
            .map(|(bar, mean)| IndicatorPoint::from_option(bar.date, mean))
            .collect(),
    }
}
