//! CSV file price source: one `<TICKER>.csv` per ticker in a data directory.
//!
//! Columns are found by header name (case-insensitive). `date`, `open` and
//! `close` are required; `high`, `low` and `volume` are optional and any
//! other column (such as `adj close`) is ignored. Rows with a blank or NaN
//! field are dropped.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::PipelineError;
use crate::domain::history::HistoryWindow;
use crate::domain::ohlcv::{Columns, OhlcvBar, PriceSeries};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Layout {
    date: usize,
    open: usize,
    close: usize,
    high_low: Option<(usize, usize)>,
    volume: Option<usize>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, PipelineError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| PipelineError::DataSource {
                reason: format!("missing {} column", name),
            })
        };
        Ok(Self {
            date: required("date")?,
            open: required("open")?,
            close: required("close")?,
            high_low: find("high").zip(find("low")),
            volume: find("volume"),
        })
    }

    fn columns(&self) -> Columns {
        Columns {
            high_low: self.high_low.is_some(),
            volume: self.volume.is_some(),
        }
    }
}

/// `Ok(None)` for a blank or NaN cell.
fn parse_field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<Option<f64>, PipelineError> {
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|e| PipelineError::DataSource {
            reason: format!("invalid {} value '{}': {}", name, raw, e),
        })
}

fn parse_date(raw: &str) -> Result<NaiveDate, PipelineError> {
    // tolerate a trailing time component
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| PipelineError::DataSource {
        reason: format!("invalid date '{}': {}", raw, e),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_bars(&self, ticker: &str) -> Result<(Vec<OhlcvBar>, Columns), PipelineError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::NoData {
                ticker: ticker.to_string(),
            },
            _ => PipelineError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| PipelineError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let layout = Layout::from_headers(headers)?;

        let mut bars = Vec::new();
        let mut dropped = 0usize;
        for result in rdr.records() {
            let record = result.map_err(|e| PipelineError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            let date = parse_date(record.get(layout.date).unwrap_or(""))?;
            let open = parse_field(&record, layout.open, "open")?;
            let close = parse_field(&record, layout.close, "close")?;
            let (high, low) = match layout.high_low {
                Some((h, l)) => (parse_field(&record, h, "high")?, parse_field(&record, l, "low")?),
                None => (close, close),
            };
            let volume = match layout.volume {
                Some(v) => parse_field(&record, v, "volume")?,
                None => Some(0.0),
            };

            match (open, high, low, close, volume) {
                (Some(open), Some(high), Some(low), Some(close), Some(volume)) => bars.push(OhlcvBar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(ticker, dropped, "dropped rows with missing values");
        }

        bars.sort_by_key(|b| b.date);
        Ok((bars, layout.columns()))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, ticker: &str, window: &HistoryWindow) -> Result<PriceSeries, PipelineError> {
        let (bars, columns) = self.read_bars(ticker)?;
        PriceSeries::new(ticker, window.apply(bars), columns)
    }
}
