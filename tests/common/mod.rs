#![allow(dead_code)]

use chrono::NaiveDate;
use ensemble_trader::domain::error::PipelineError;
use ensemble_trader::domain::history::HistoryWindow;
pub use ensemble_trader::domain::ohlcv::OhlcvBar;
use ensemble_trader::domain::ohlcv::{Columns, PriceSeries};
use ensemble_trader::domain::pipeline::PipelineConfig;
use ensemble_trader::domain::report::TradeLogRecord;
use ensemble_trader::domain::retry::RetryPolicy;
use ensemble_trader::ports::data_port::DataPort;
use ensemble_trader::ports::notifier_port::NotifierPort;
use ensemble_trader::ports::trade_log_port::TradeLogPort;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, ticker: &str, window: &HistoryWindow) -> Result<PriceSeries, PipelineError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(PipelineError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(ticker).cloned().unwrap_or_default();
        PriceSeries::new(ticker, window.apply(bars), Columns::default())
    }
}

/// Trade log that keeps records in memory. Fails the first `failures` calls.
pub struct RecordingTradeLog {
    pub records: RefCell<Vec<TradeLogRecord>>,
    pub calls: Cell<u32>,
    failures: u32,
}

impl RecordingTradeLog {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: u32) -> Self {
        Self {
            records: RefCell::new(Vec::new()),
            calls: Cell::new(0),
            failures,
        }
    }
}

impl TradeLogPort for RecordingTradeLog {
    fn append(&self, record: &TradeLogRecord) -> Result<(), PipelineError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call <= self.failures {
            return Err(PipelineError::Io(std::io::Error::other("log unavailable")));
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub calls: Cell<u32>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: RefCell::new(Vec::new()),
            calls: Cell::new(0),
            fail: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

impl NotifierPort for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, message: &str) -> Result<(), PipelineError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(PipelineError::ExternalService {
                service: "recording".into(),
                attempts: 1,
                reason: "HTTP 502".into(),
            });
        }
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2023, 1, 2);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close * 0.998,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0 + (i % 10) as f64 * 50_000.0,
        })
        .collect()
}

/// Uptrend in 20-bar cycles: 12 bars of +0.6%, a 4-bar dip of -2.5% and a
/// 4-bar rebound of +2.5%. The last dip bar pushes RSI(14) under 40 while the
/// 20DMA stays above the 50DMA.
pub fn uptrend_with_dips(n: usize) -> Vec<OhlcvBar> {
    let mut price = 100.0;
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            if i > 0 {
                price *= match i % 20 {
                    0..=11 => 1.006,
                    12..=15 => 0.975,
                    _ => 1.025,
                };
            }
            price
        })
        .collect();
    bars_from_closes(&closes)
}

/// Steady decline: the 20DMA never crosses above the 50DMA, so no trades.
pub fn downtrend(n: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 * 0.995f64.powi(i as i32)).collect();
    bars_from_closes(&closes)
}

pub fn config_for(tickers: &[&str]) -> PipelineConfig {
    PipelineConfig {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        retry: RetryPolicy::no_delay(3),
        ..PipelineConfig::default()
    }
}

pub fn today() -> NaiveDate {
    date(2024, 5, 1)
}
