//! Tabular sink for per-asset results.

use crate::domain::error::PipelineError;
use crate::domain::report::TradeLogRecord;

pub trait TradeLogPort {
    fn append(&self, record: &TradeLogRecord) -> Result<(), PipelineError>;
}
