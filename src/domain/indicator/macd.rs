//! MACD line indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), with both EMAs seeded on the first
//! close. Only the line is used downstream (no signal line or histogram).
//!
//! Default parameters: fast=12, slow=26

use crate::domain::indicator::{calculate_ema, IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;

pub fn calculate_macd_line(bars: &[OhlcvBar], fast: usize, slow: usize) -> IndicatorSeries {
    let ema_fast = calculate_ema(bars, fast);
    let ema_slow = calculate_ema(bars, slow);

    let values = ema_fast
        .values
        .iter()
        .zip(&ema_slow.values)
        .map(|(f, s)| match (f.get(), s.get()) {
            (Some(f_val), Some(s_val)) => IndicatorPoint::valid(f.date, f_val - s_val),
            _ => IndicatorPoint::invalid(f.date),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::MacdLine { fast, slow },
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd_line(bars, DEFAULT_FAST, DEFAULT_SLOW)
}
