//! ROC (Rate of Change) indicator implementation.
//!
//! ROC(n)[i] = C[i] / C[i-n] - 1, as a fraction (0.05 = +5%).
//! If C[i-n] == 0: no value.
//! Warmup: first n bars invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{pct_change, to_column};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_roc(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let changes = pct_change(&to_column(&closes), period);

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values: bars
            .iter()
            .zip(changes)
            .map(|(bar, change)| IndicatorPoint::from_option(bar.date, change))
            .collect(),
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
    fn roc_warmup() {
        let series = calculate_roc(&make_bars(&[100.0, 105.0, 110.0, 115.0, 120.0]), 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn roc_basic_calculation() {
        let series = calculate_roc(&make_bars(&[100.0, 105.0, 110.0, 115.0]), 2);
        assert!((series.values[2].value - 0.10).abs() < 1e-12);
        assert!((series.values[3].value - (115.0 / 105.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn roc_zero_division() {
        let series = calculate_roc(&make_bars(&[0.0, 100.0, 110.0]), 2);
        assert!(!series.values[2].valid);
    }

    #[test]
    fn roc_negative_change() {
        let series = calculate_roc(&make_bars(&[100.0, 90.0, 80.0]), 2);
        assert!((series.values[2].value + 0.20).abs() < 1e-12);
    }

    #[test]
    fn roc_indicator_type() {
        let series = calculate_roc(&make_bars(&[100.0, 105.0]), 10);
        assert_eq!(series.indicator_type, IndicatorType::Roc(10));
    }
}
