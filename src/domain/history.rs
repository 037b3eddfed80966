//! How much price history to request: a lookback period and a bar interval.
//!
//! Periods use the compact form common to market-data services: `90d`,
//! `2wk`, `12mo`, `1y` or `max`.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};

use crate::domain::error::PipelineError;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl Lookback {
    /// First date inside the window ending at `latest`; `None` means no limit.
    pub fn start_from(&self, latest: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Lookback::Days(n) => latest.checked_sub_days(Days::new(n as u64)),
            Lookback::Weeks(n) => latest.checked_sub_days(Days::new(n as u64 * 7)),
            Lookback::Months(n) => latest.checked_sub_months(Months::new(n)),
            Lookback::Years(n) => latest.checked_sub_months(Months::new(n.saturating_mul(12))),
            Lookback::Max => None,
        }
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "max" {
            return Ok(Lookback::Max);
        }
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("period '{}' has no unit", s))?;
        let (digits, unit) = s.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| format!("period '{}' does not start with a number", s))?;
        if n == 0 {
            return Err(format!("period '{}' is empty", s));
        }
        match unit {
            "d" => Ok(Lookback::Days(n)),
            "wk" => Ok(Lookback::Weeks(n)),
            "mo" => Ok(Lookback::Months(n)),
            "y" => Ok(Lookback::Years(n)),
            other => Err(format!("unknown period unit '{}' (expected d, wk, mo, y or max)", other)),
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(n) => write!(f, "{}d", n),
            Lookback::Weeks(n) => write!(f, "{}wk", n),
            Lookback::Months(n) => write!(f, "{}mo", n),
            Lookback::Years(n) => write!(f, "{}y", n),
            Lookback::Max => write!(f, "max"),
        }
    }
}

/// Bar spacing. Only daily bars are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Daily,
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Interval::Daily),
            other => Err(format!("interval '{}' is not supported, only 1d", other)),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Daily => write!(f, "1d"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub lookback: Lookback,
    pub interval: Interval,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            lookback: Lookback::Months(12),
            interval: Interval::Daily,
        }
    }
}

impl HistoryWindow {
    /// Parses the `period` and `interval` values of the `[pipeline]` section.
    pub fn parse(period: &str, interval: &str) -> Result<Self, PipelineError> {
        let lookback = period
            .parse()
            .map_err(|e: String| PipelineError::config_invalid("pipeline", "period", e))?;
        let interval = interval
            .parse()
            .map_err(|e: String| PipelineError::config_invalid("pipeline", "interval", e))?;
        Ok(Self { lookback, interval })
    }

    /// Keeps the bars inside the window, measured back from the latest bar.
    /// Expects bars sorted by date.
    pub fn apply(&self, bars: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
        let Some(latest) = bars.last().map(|b| b.date) else {
            return bars;
        };
        match self.lookback.start_from(latest) {
            Some(start) => bars.into_iter().filter(|b| b.date >= start).collect(),
            None => bars,
        }
    }
}
