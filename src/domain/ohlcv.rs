//! OHLCV bar and price series representation.

use chrono::NaiveDate;

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// (high - low) / close
    pub fn range_ratio(&self) -> f64 {
        (self.high - self.low) / self.close
    }

    /// Where the close sits inside the bar's range: 0 at the low, 1 at the high.
    /// A flat bar (high == low) has no defined position.
    pub fn close_position(&self) -> Option<f64> {
        let range = self.high - self.low;
        if range == 0.0 {
            None
        } else {
            Some((self.close - self.low) / range)
        }
    }
}

/// Which optional columns the data source actually supplied.
///
/// Sources without intrabar range or volume still produce bars (with those
/// fields filled from close / zero); the feature engineer uses these flags to
/// substitute neutral defaults instead of reading the filler values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub high_low: bool,
    pub volume: bool,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            high_low: true,
            volume: true,
        }
    }
}

/// A cleaned, strictly time-ordered price history for one ticker.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<OhlcvBar>,
    columns: Columns,
}

impl PriceSeries {
    /// Cleans and validates raw bars.
    ///
    /// Bars with non-finite fields are dropped, the rest are sorted by date and
    /// duplicate dates keep their first occurrence. Nothing left is `NoData`.
    pub fn new(
        ticker: impl Into<String>,
        mut bars: Vec<OhlcvBar>,
        columns: Columns,
    ) -> Result<Self, PipelineError> {
        let ticker = ticker.into();
        bars.retain(OhlcvBar::is_finite);
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        if bars.is_empty() {
            return Err(PipelineError::NoData { ticker });
        }

        Ok(Self {
            ticker,
            bars,
            columns,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn columns(&self) -> Columns {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }
}
