//! Indicator frame: a price series plus the columns the entry rule reads.

use crate::domain::indicator::rsi::{self, calculate_rsi};
use crate::domain::indicator::sma::{calculate_sma, LONG_PERIOD, SHORT_PERIOD};
use crate::domain::ohlcv::PriceSeries;

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub series: PriceSeries,
    pub rsi: Vec<Option<f64>>,
    pub dma_20: Vec<Option<f64>>,
    pub dma_50: Vec<Option<f64>>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// SMA(20) and SMA(50) of close.
pub fn compute_moving_averages(series: &PriceSeries) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    (
        calculate_sma(series.bars(), SHORT_PERIOD).to_options(),
        calculate_sma(series.bars(), LONG_PERIOD).to_options(),
    )
}

/// Takes ownership of the series and attaches RSI(14), 20DMA and 50DMA.
pub fn compute_indicators(series: PriceSeries) -> IndicatorFrame {
    let rsi = calculate_rsi(series.bars(), rsi::DEFAULT_PERIOD).to_options();
    let (dma_20, dma_50) = compute_moving_averages(&series);

    IndicatorFrame {
        series,
        rsi,
        dma_20,
        dma_50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{Columns, OhlcvBar};
    use chrono::NaiveDate;

    fn series(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1;
                OhlcvBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect();
        PriceSeries::new("TEST", bars, Columns::default()).unwrap()
    }

    #[test]
    fn columns_align_with_series() {
        let frame = compute_indicators(series(60));
        assert_eq!(frame.len(), 60);
        assert_eq!(frame.rsi.len(), 60);
        assert_eq!(frame.dma_20.len(), 60);
        assert_eq!(frame.dma_50.len(), 60);
    }

    #[test]
    fn warmups_are_undefined() {
        let frame = compute_indicators(series(60));
        assert!(frame.rsi[..14].iter().all(Option::is_none));
        assert!(frame.rsi[14].is_some());
        assert!(frame.dma_20[..19].iter().all(Option::is_none));
        assert!(frame.dma_20[19].is_some());
        assert!(frame.dma_50[..49].iter().all(Option::is_none));
        assert!(frame.dma_50[49].is_some());
    }

    #[test]
    fn caller_copy_is_untouched() {
        let original = series(30);
        let frame = compute_indicators(original.clone());
        assert_eq!(original.closes(), frame.series.closes());
    }
}
