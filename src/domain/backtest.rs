//! Vectorised backtest of the entry signal.
//!
//! Positions are the signal lagged by one period, so a signal computed on
//! today's close can only earn tomorrow's return. Strategy returns are
//! compounded into the total return.

use crate::domain::error::PipelineError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::SignalFrame;

#[derive(Debug, Clone)]
pub struct BacktestFrame {
    pub signals: SignalFrame,
    pub position: Vec<u8>,
    pub period_return: Vec<Option<f64>>,
    pub strategy_return: Vec<Option<f64>>,
}

impl BacktestFrame {
    pub fn series(&self) -> &PriceSeries {
        &self.signals.indicators.series
    }

    pub fn ticker(&self) -> &str {
        self.series().ticker()
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestSummary {
    /// Compounded return, 0.05 = +5%.
    pub total_return: f64,
    /// Winning periods over periods with a non-zero strategy return.
    pub win_ratio: f64,
    /// Periods with a non-zero strategy return.
    pub trades: usize,
    pub wins: usize,
}

/// Simulates the signal and returns the summary together with the frame.
///
/// Fails with `NoTrades` when no period produced a non-zero strategy return,
/// since the win ratio is undefined in that case.
pub fn backtest(signals: SignalFrame) -> Result<(BacktestSummary, BacktestFrame), PipelineError> {
    let closes = signals.indicators.series.closes();
    let n = closes.len();

    let mut position = Vec::with_capacity(n);
    let mut period_return = Vec::with_capacity(n);
    let mut strategy_return = Vec::with_capacity(n);

    for i in 0..n {
        if i == 0 {
            position.push(0);
            period_return.push(None);
            strategy_return.push(None);
            continue;
        }
        let held = signals.signal[i - 1];
        let ret = closes[i] / closes[i - 1] - 1.0;
        let ret = ret.is_finite().then_some(ret);
        position.push(held);
        period_return.push(ret);
        strategy_return.push(ret.map(|r| r * held as f64));
    }

    let mut growth = 1.0;
    let mut trades = 0usize;
    let mut wins = 0usize;
    for r in strategy_return.iter().flatten() {
        growth *= 1.0 + r;
        if *r != 0.0 {
            trades += 1;
            if *r > 0.0 {
                wins += 1;
            }
        }
    }

    let frame = BacktestFrame {
        signals,
        position,
        period_return,
        strategy_return,
    };

    if trades == 0 {
        return Err(PipelineError::NoTrades {
            ticker: frame.ticker().to_string(),
        });
    }

    let summary = BacktestSummary {
        total_return: growth - 1.0,
        win_ratio: wins as f64 / trades as f64,
        trades,
        wins,
    };

    Ok((summary, frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorFrame;
    use crate::domain::ohlcv::{Columns, OhlcvBar};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn signal_frame(closes: &[f64], signal: Vec<u8>) -> SignalFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        let n = closes.len();
        SignalFrame {
            indicators: IndicatorFrame {
                series: PriceSeries::new("TEST", bars, Columns::default()).unwrap(),
                rsi: vec![None; n],
                dma_20: vec![None; n],
                dma_50: vec![None; n],
            },
            signal,
        }
    }

    #[test]
    fn position_lags_signal_by_one() {
        let signal = vec![1, 0, 1, 1, 0];
        let (_, frame) = backtest(signal_frame(&[10.0, 11.0, 12.0, 11.0, 12.0], signal.clone())).unwrap();
        assert_eq!(frame.position[0], 0);
        for t in 1..signal.len() {
            assert_eq!(frame.position[t], signal[t - 1]);
        }
    }

    #[test]
    fn total_return_is_compounded() {
        // period returns 0.01, -0.02, 0.03, all held
        let c0 = 100.0;
        let c1 = c0 * 1.01;
        let c2 = c1 * 0.98;
        let c3 = c2 * 1.03;
        let (summary, frame) = backtest(signal_frame(&[c0, c1, c2, c3], vec![1, 1, 1, 0])).unwrap();

        assert_relative_eq!(frame.period_return[1].unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(frame.period_return[2].unwrap(), -0.02, epsilon = 1e-12);
        assert_relative_eq!(frame.period_return[3].unwrap(), 0.03, epsilon = 1e-12);

        let compounded = 1.01 * 0.98 * 1.03 - 1.0;
        let summed = 0.01 - 0.02 + 0.03;
        assert_relative_eq!(summary.total_return, compounded, epsilon = 1e-12);
        assert!((summary.total_return - summed).abs() > 1e-6);
    }

    #[test]
    fn win_ratio_counts_only_non_zero_periods() {
        // held on periods 1, 2, 3; returns +, -, + ; period 4 flat
        let (summary, _) =
            backtest(signal_frame(&[10.0, 11.0, 10.0, 12.0, 13.0], vec![1, 1, 1, 0, 0])).unwrap();
        assert_eq!(summary.trades, 3);
        assert_eq!(summary.wins, 2);
        assert_relative_eq!(summary.win_ratio, 2.0 / 3.0);
    }

    #[test]
    fn flat_positions_are_no_trades() {
        let err = backtest(signal_frame(&[10.0, 11.0, 12.0], vec![0, 0, 0])).unwrap_err();
        assert!(matches!(err, PipelineError::NoTrades { ref ticker } if ticker == "TEST"));
    }

    #[test]
    fn signal_on_last_bar_is_never_traded() {
        let err = backtest(signal_frame(&[10.0, 11.0, 12.0], vec![0, 0, 1])).unwrap_err();
        assert!(matches!(err, PipelineError::NoTrades { .. }));
    }

    #[test]
    fn held_flat_price_is_no_trade() {
        let err = backtest(signal_frame(&[10.0, 10.0, 10.0], vec![1, 1, 1])).unwrap_err();
        assert!(matches!(err, PipelineError::NoTrades { .. }));
    }

    #[test]
    fn strategy_return_is_period_return_times_position() {
        let (_, frame) = backtest(signal_frame(&[10.0, 11.0, 12.1, 13.31], vec![0, 1, 0, 0])).unwrap();
        assert_eq!(frame.strategy_return[0], None);
        assert_eq!(frame.strategy_return[1], Some(0.0));
        assert_relative_eq!(frame.strategy_return[2].unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(frame.strategy_return[3], Some(0.0));
    }
}
