//! Trade log kept as an append-only CSV file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use crate::domain::error::PipelineError;
use crate::domain::report::TradeLogRecord;
use crate::ports::trade_log_port::TradeLogPort;

pub struct CsvTradeLogAdapter {
    path: PathBuf,
}

impl CsvTradeLogAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TradeLogPort for CsvTradeLogAdapter {
    /// Appends one row, writing the header first if the file is new or empty.
    fn append(&self, record: &TradeLogRecord) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(record.to_row())
            .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
        wtr.flush()?;
        Ok(())
    }
}
