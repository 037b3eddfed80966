//! Rolling Standard Deviation of closing price.
//!
//! Sample standard deviation over n closing prices (divides by n - 1).
//! Warmup: first (n-1) bars are invalid. Periods below 2 are never valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{rolling_std, to_column};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_stddev(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let stds = rolling_std(&to_column(&closes), period);

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values: bars
            .iter()
            .zip(stds)
            .map(|(bar, std)| IndicatorPoint::from_option(bar.date, std))
            .collect(),
    }
}
