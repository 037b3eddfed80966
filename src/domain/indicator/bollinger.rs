//! Bollinger band position.
//!
//! Position of the close relative to the band:
//! - Middle: SMA(n) of close
//! - Half width: multiplier × sample StdDev(n)
//! - Position: (close - middle) / half width
//!
//! 0 sits on the middle band, +1 / -1 on the upper / lower band.
//! A zero-width band (constant window) has no value.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{finite, rolling_mean, rolling_std, to_column};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

pub fn calculate_band_position(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let column = to_column(&closes);
    let middles = rolling_mean(&column, period);
    let stds = rolling_std(&column, period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let position = match (middles[i], stds[i]) {
                (Some(middle), Some(std)) => finite((bar.close - middle) / (mult * std)),
                _ => None,
            };
            IndicatorPoint::from_option(bar.date, position)
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::BandPosition {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn band_position_warmup() {
        let series = calculate_band_position(&make_bars(&[10.0, 20.0, 30.0, 40.0]), 3, 200);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn band_position_basic_calculation() {
        let series = calculate_band_position(&make_bars(&[10.0, 20.0, 30.0]), 3, 200);
        // middle 20, sample std 10 -> (30 - 20) / 20
        assert!((series.values[2].value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn band_position_constant_window_has_no_value() {
        let series = calculate_band_position(&make_bars(&[100.0; 5]), 3, 200);
        assert_eq!(series.valid_count(), 0);
    }

    #[test]
    fn band_position_multiplier_variations() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let two = calculate_band_position(&bars, 3, 200);
        let one = calculate_band_position(&bars, 3, 100);
        assert!((one.values[2].value - 2.0 * two.values[2].value).abs() < 1e-12);
    }

    #[test]
    fn band_position_indicator_type() {
        let series = calculate_band_position(&make_bars(&[10.0]), DEFAULT_PERIOD, DEFAULT_MULT_X100);
        assert_eq!(
            series.indicator_type,
            IndicatorType::BandPosition {
                period: 20,
                stddev_mult_x100: 200
            }
        );
    }
}
