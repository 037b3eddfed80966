//! Price history source.

use crate::domain::error::PipelineError;
use crate::domain::history::HistoryWindow;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Cleaned daily bars for `ticker` inside `window`.
    ///
    /// An unknown ticker or an empty result is `NoData`; transport and parse
    /// failures are `DataSource`.
    fn fetch_prices(&self, ticker: &str, window: &HistoryWindow) -> Result<PriceSeries, PipelineError>;
}
