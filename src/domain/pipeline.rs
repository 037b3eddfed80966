//! Per-asset research pipeline.
//!
//! fetch -> indicators -> signal -> backtest -> features -> training ->
//! trade log -> notification. Each asset is isolated: a failure skips only
//! that asset. Training problems do not skip the asset; its backtest is still
//! logged with the ML fields left empty.

use std::fmt;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::backtest::{backtest, BacktestSummary};
use crate::domain::error::PipelineError;
use crate::domain::features::{engineer_features, FillPolicy, TARGET_THRESHOLD};
use crate::domain::history::HistoryWindow;
use crate::domain::indicator::compute_indicators;
use crate::domain::model::{train_classifier, TrainedClassifier, TrainingReport};
use crate::domain::report::{format_notification, TradeLogRecord};
use crate::domain::retry::{with_retry, RetryPolicy};
use crate::domain::signal::{generate_signal, SignalRule};
use crate::ports::data_port::DataPort;
use crate::ports::notifier_port::NotifierPort;
use crate::ports::trade_log_port::TradeLogPort;

pub const DEFAULT_SEED: u64 = 42;

/// Everything a run needs, built once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub window: HistoryWindow,
    pub rule: SignalRule,
    pub fill_policy: FillPolicy,
    pub target_threshold: f64,
    pub seed: u64,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            window: HistoryWindow::default(),
            rule: SignalRule::default(),
            fill_policy: FillPolicy::default(),
            target_threshold: TARGET_THRESHOLD,
            seed: DEFAULT_SEED,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Backtest,
    Features,
    Training,
    TradeLog,
    Notify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Backtest => "backtest",
            Stage::Features => "features",
            Stage::Training => "training",
            Stage::TradeLog => "trade log",
            Stage::Notify => "notify",
        };
        write!(f, "{}", name)
    }
}

/// Result of the pure part of the pipeline for one asset.
#[derive(Debug)]
pub struct AssetAnalysis {
    pub ticker: String,
    pub summary: BacktestSummary,
    pub model: Option<(TrainedClassifier, TrainingReport)>,
    /// Why training produced no model, if it did not.
    pub ml_failure: Option<(Stage, PipelineError)>,
}

impl AssetAnalysis {
    pub fn training(&self) -> Option<&TrainingReport> {
        self.model.as_ref().map(|(_, report)| report)
    }
}

#[derive(Debug)]
pub struct AssetReport {
    pub record: TradeLogRecord,
    pub analysis: AssetAnalysis,
    pub logged: bool,
    pub notified: bool,
}

#[derive(Debug)]
pub enum AssetOutcome {
    Completed(AssetReport),
    Skipped {
        ticker: String,
        stage: Stage,
        error: PipelineError,
    },
}

impl AssetOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            AssetOutcome::Completed(report) => &report.record.ticker,
            AssetOutcome::Skipped { ticker, .. } => ticker,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AssetOutcome::Completed(_))
    }
}

/// Where results go. Either sink may be absent (dry runs, `notify = none`).
#[derive(Clone, Copy, Default)]
pub struct Sinks<'a> {
    pub trade_log: Option<&'a dyn TradeLogPort>,
    pub notifier: Option<&'a dyn NotifierPort>,
}

impl<'a> Sinks<'a> {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Fetches, backtests and trains for one ticker without touching any sink.
pub fn analyze_asset(
    data: &dyn DataPort,
    ticker: &str,
    config: &PipelineConfig,
) -> Result<AssetAnalysis, (Stage, PipelineError)> {
    info!(ticker, "fetching data");
    let series = data
        .fetch_prices(ticker, &config.window)
        .map_err(|e| (Stage::Fetch, e))?;
    info!(ticker, bars = series.len(), "data received");

    let signals = generate_signal(compute_indicators(series), &config.rule);
    let (summary, frame) = backtest(signals).map_err(|e| (Stage::Backtest, e))?;
    info!(
        ticker,
        total_return = %format!("{:.2}%", summary.total_return * 100.0),
        win_ratio = %format!("{:.2}%", summary.win_ratio * 100.0),
        trades = summary.trades,
        "backtest complete"
    );

    let trained = engineer_features(frame, config.fill_policy, config.target_threshold)
        .map_err(|e| (Stage::Features, e))
        .and_then(|features| {
            train_classifier(&features, config.seed).map_err(|e| (Stage::Training, e))
        });

    let (model, ml_failure) = match trained {
        Ok(model) => (Some(model), None),
        Err((stage, e)) => {
            warn!(ticker, %stage, error = %e, "ML training failed");
            (None, Some((stage, e)))
        }
    };

    Ok(AssetAnalysis {
        ticker: ticker.to_string(),
        summary,
        model,
        ml_failure,
    })
}

/// Runs the whole pipeline for one ticker.
pub fn run_asset(
    data: &dyn DataPort,
    sinks: Sinks<'_>,
    ticker: &str,
    config: &PipelineConfig,
    today: NaiveDate,
) -> AssetOutcome {
    let analysis = match analyze_asset(data, ticker, config) {
        Ok(analysis) => analysis,
        Err((stage, error)) => {
            warn!(ticker, %stage, error = %error, "skipping asset");
            return AssetOutcome::Skipped {
                ticker: ticker.to_string(),
                stage,
                error,
            };
        }
    };

    let record = TradeLogRecord::new(today, ticker, &analysis.summary, analysis.training());

    let logged = match sinks.trade_log {
        Some(log) => match with_retry(&config.retry, "trade log", || log.append(&record)) {
            Ok(()) => true,
            Err(error) => {
                warn!(ticker, error = %error, "failed to log trade, skipping notification");
                return AssetOutcome::Skipped {
                    ticker: ticker.to_string(),
                    stage: Stage::TradeLog,
                    error,
                };
            }
        },
        None => false,
    };
    info!(
        ticker,
        total_return = %format!("{:.2}%", record.total_return_pct),
        win_ratio = %format!("{:.2}%", record.win_ratio_pct),
        accuracy = %record.accuracy_text(),
        auc = %record.auc_text(),
        model = %record.model_text(),
        logged,
        "asset complete"
    );

    let notified = match sinks.notifier {
        Some(notifier) => {
            let message = format_notification(&record, &config.rule);
            match with_retry(&config.retry, notifier.name(), || notifier.send(&message)) {
                Ok(()) => true,
                Err(e) => {
                    warn!(ticker, stage = %Stage::Notify, error = %e, "notification not sent");
                    false
                }
            }
        }
        None => false,
    };

    AssetOutcome::Completed(AssetReport {
        record,
        analysis,
        logged,
        notified,
    })
}

/// Runs every configured ticker in order.
pub fn run_pipeline(
    data: &dyn DataPort,
    sinks: Sinks<'_>,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Vec<AssetOutcome> {
    config
        .tickers
        .iter()
        .map(|ticker| run_asset(data, sinks, ticker, config, today))
        .collect()
}
