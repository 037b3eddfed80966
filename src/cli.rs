//! CLI definition and dispatch.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_log_adapter::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::notifier::{ConsoleNotifier, FileNotifier, NotifierKind};
use crate::domain::config_validation::{parse_schedule_time, pipeline_config, schedule_time, validate_config};
use crate::domain::error::PipelineError;
use crate::domain::model::TrainingReport;
use crate::domain::pipeline::{analyze_asset, run_pipeline, AssetOutcome, PipelineConfig, Sinks};
use crate::ports::config_port::ConfigPort;
use crate::ports::notifier_port::NotifierPort;
use crate::ports::trade_log_port::TradeLogPort;

#[derive(Parser, Debug)]
#[command(name = "ensemble-trader", about = "RSI/moving-average backtester with ML signal scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once for every configured ticker
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single ticker instead of the configured list
        #[arg(long)]
        ticker: Option<String>,
        /// Analyse only: write no trade log and send no notifications
        #[arg(long)]
        dry_run: bool,
    },
    /// Backtest and train one ticker, printing the results
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
    /// Run the pipeline every day at a fixed local time
    Schedule {
        #[arg(short, long)]
        config: PathBuf,
        /// HH:MM, overrides [schedule] at
        #[arg(long)]
        at: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            ticker,
            dry_run,
        } => run_once(&config, ticker.as_deref(), dry_run),
        Command::Backtest { config, ticker } => run_backtest(&config, &ticker),
        Command::Schedule { config, at } => run_schedule(&config, at.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PipelineError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: PipelineError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, PipelineError> {
    config
        .get_string(section, key)
        .ok_or_else(|| PipelineError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

pub fn build_data_port(config: &dyn ConfigPort) -> CsvAdapter {
    let dir = config.get_string("data", "dir").unwrap_or_else(|| "data".to_string());
    CsvAdapter::new(PathBuf::from(dir))
}

/// `None` when `[trade_log] enabled = false`.
pub fn build_trade_log(config: &dyn ConfigPort) -> Option<CsvTradeLogAdapter> {
    if !config.get_bool("trade_log", "enabled", true) {
        return None;
    }
    let path = config
        .get_string("trade_log", "path")
        .unwrap_or_else(|| "trade_log.csv".to_string());
    Some(CsvTradeLogAdapter::new(PathBuf::from(path)))
}

pub fn build_notifier(config: &dyn ConfigPort) -> Result<Option<Box<dyn NotifierPort>>, PipelineError> {
    let kind: NotifierKind = config
        .get_string("notify", "kind")
        .unwrap_or_else(|| "console".to_string())
        .parse()
        .map_err(|e: String| PipelineError::config_invalid("notify", "kind", e))?;

    match kind {
        NotifierKind::None => Ok(None),
        NotifierKind::Console => Ok(Some(Box::new(ConsoleNotifier))),
        NotifierKind::File => {
            let path = required(config, "notify", "path")?;
            Ok(Some(Box::new(FileNotifier::new(PathBuf::from(path)))))
        }
        NotifierKind::Telegram => build_telegram(config),
    }
}

#[cfg(feature = "telegram")]
fn build_telegram(config: &dyn ConfigPort) -> Result<Option<Box<dyn NotifierPort>>, PipelineError> {
    use crate::adapters::notifier::TelegramNotifier;

    let token = required(config, "notify", "telegram_bot_token")?;
    let chat_id = required(config, "notify", "telegram_chat_id")?;
    Ok(Some(Box::new(TelegramNotifier::new(token, chat_id)?)))
}

#[cfg(not(feature = "telegram"))]
fn build_telegram(_config: &dyn ConfigPort) -> Result<Option<Box<dyn NotifierPort>>, PipelineError> {
    Err(PipelineError::config_invalid(
        "notify",
        "kind",
        "telegram support is not compiled in (build with --features telegram)",
    ))
}

/// Ports and settings for one or more runs, built once from the config.
struct Runner {
    config: PipelineConfig,
    data: CsvAdapter,
    trade_log: Option<CsvTradeLogAdapter>,
    notifier: Option<Box<dyn NotifierPort>>,
}

impl Runner {
    fn from_config(adapter: &dyn ConfigPort, dry_run: bool) -> Result<Self, PipelineError> {
        validate_config(adapter)?;
        let config = pipeline_config(adapter)?;
        let (trade_log, notifier) = if dry_run {
            (None, None)
        } else {
            (build_trade_log(adapter), build_notifier(adapter)?)
        };
        Ok(Self {
            config,
            data: build_data_port(adapter),
            trade_log,
            notifier,
        })
    }

    fn sinks(&self) -> Sinks<'_> {
        Sinks {
            trade_log: self.trade_log.as_ref().map(|t| t as &dyn TradeLogPort),
            notifier: self.notifier.as_deref(),
        }
    }

    fn run(&self, today: NaiveDate) -> Vec<AssetOutcome> {
        info!(tickers = self.config.tickers.len(), %today, "starting run");
        run_pipeline(&self.data, self.sinks(), &self.config, today)
    }
}

fn run_once(config_path: &Path, ticker: Option<&str>, dry_run: bool) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut runner = match Runner::from_config(&adapter, dry_run) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    if let Some(ticker) = ticker {
        runner.config.tickers = vec![ticker.trim().to_uppercase()];
    }
    if dry_run {
        eprintln!("Dry run: no trade log rows or notifications will be written");
    }

    let outcomes = runner.run(Local::now().date_naive());
    print_summary(&outcomes);
    outcomes_exit_code(&outcomes)
}

/// Success when at least one asset completed, or when there was nothing to run.
pub fn outcomes_exit_code(outcomes: &[AssetOutcome]) -> ExitCode {
    if outcomes.is_empty() || outcomes.iter().any(AssetOutcome::is_completed) {
        return ExitCode::SUCCESS;
    }
    outcomes
        .iter()
        .rev()
        .find_map(|o| match o {
            AssetOutcome::Skipped { error, .. } => Some(ExitCode::from(error)),
            AssetOutcome::Completed(_) => None,
        })
        .unwrap_or(ExitCode::SUCCESS)
}

pub fn print_summary(outcomes: &[AssetOutcome]) {
    eprintln!("\n=== Run Summary ===");
    eprintln!(
        "{:<10} {:>10} {:>10} {:>10} {:>7}  {}",
        "Ticker", "Return", "Win Ratio", "Accuracy", "AUC", "Model"
    );
    for outcome in outcomes {
        match outcome {
            AssetOutcome::Completed(report) => {
                let r = &report.record;
                eprintln!(
                    "{:<10} {:>9.2}% {:>9.2}% {:>10} {:>7}  {}",
                    r.ticker,
                    r.total_return_pct,
                    r.win_ratio_pct,
                    r.accuracy_text(),
                    r.auc_text(),
                    r.model_text()
                );
            }
            AssetOutcome::Skipped { ticker, stage, error } => {
                eprintln!("{:<10} skipped at {}: {}", ticker, stage, error);
            }
        }
    }
    let completed = outcomes.iter().filter(|o| o.is_completed()).count();
    eprintln!("\n{} of {} assets completed", completed, outcomes.len());
}

fn print_training(report: &TrainingReport) {
    eprintln!("\n=== Model ===");
    eprintln!("Model:            {}", report.kind);
    if let Some(reason) = report.simple_reason {
        eprintln!("Fallback reason:  {}", reason);
    }
    eprintln!("Train/Test Rows:  {} / {}", report.train_rows, report.test_rows);
    eprintln!(
        "Class Counts:     {} down / {} up",
        report.class_counts.0, report.class_counts.1
    );
    eprintln!("Accuracy:         {:.2}%", report.accuracy * 100.0);
    eprintln!("AUC:              {:.3}", report.auc);
    if let Some(importance) = &report.feature_importance {
        eprintln!("\nTop Features:");
        for (name, value) in importance.iter().take(5) {
            eprintln!("  {:<22} {:.4}", name, value);
        }
    }
}

fn run_backtest(config_path: &Path, ticker: &str) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match pipeline_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let data = build_data_port(&adapter);
    let ticker = ticker.trim().to_uppercase();

    let analysis = match analyze_asset(&data, &ticker, &config) {
        Ok(a) => a,
        Err((stage, e)) => {
            eprintln!("error: {} failed at {}", ticker, stage);
            return fail(e);
        }
    };

    eprintln!("\n=== Backtest: {} ===", ticker);
    eprintln!("Strategy:         {}", config.rule);
    eprintln!("Total Return:     {:.2}%", analysis.summary.total_return * 100.0);
    eprintln!("Win Ratio:        {:.2}%", analysis.summary.win_ratio * 100.0);
    eprintln!(
        "Trades:           {} ({} winning)",
        analysis.summary.trades, analysis.summary.wins
    );

    match (analysis.training(), &analysis.ml_failure) {
        (Some(report), _) => print_training(report),
        (None, Some((stage, e))) => eprintln!("\nML skipped at {}: {}", stage, e),
        (None, None) => {}
    }
    ExitCode::SUCCESS
}

/// The first run time strictly after `now` at wall-clock `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

fn run_schedule(config_path: &Path, at_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let at = match at_override {
        Some(raw) => parse_schedule_time(raw),
        None => schedule_time(&adapter),
    };
    let at = match at {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let runner = match Runner::from_config(&adapter, false) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    eprintln!("Scheduled daily at {}", at.format("%H:%M"));
    let outcomes = runner.run(Local::now().date_naive());
    print_summary(&outcomes);
    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        info!(next = %next.format("%Y-%m-%d %H:%M"), "waiting for next run");
        if let Ok(wait) = (next - now).to_std() {
            std::thread::sleep(wait);
        }
        let outcomes = runner.run(next.date());
        print_summary(&outcomes);
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match validate_config(&adapter).and_then(|_| pipeline_config(&adapter)) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = build_notifier(&adapter) {
        return fail(e);
    }

    eprintln!("\nTickers:          {}", config.tickers.join(", "));
    eprintln!("Window:           {} / {}", config.window.lookback, config.window.interval);
    eprintln!("Strategy:         {}", config.rule);
    eprintln!("Fill Policy:      {}", config.fill_policy);
    eprintln!("Target Threshold: {}", config.target_threshold);
    eprintln!("Seed:             {}", config.seed);
    eprintln!(
        "Retry:            {} attempt(s), {:?} apart",
        config.retry.attempts, config.retry.delay
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn next_run_later_today() {
        let now = day(4).and_time(at(8, 0));
        assert_eq!(next_run_after(now, at(9, 15)), day(4).and_time(at(9, 15)));
    }

    #[test]
    fn next_run_tomorrow_when_passed() {
        let now = day(4).and_time(at(9, 15));
        assert_eq!(next_run_after(now, at(9, 15)), day(5).and_time(at(9, 15)));
        let now = day(4).and_time(at(23, 59));
        assert_eq!(next_run_after(now, at(9, 15)), day(5).and_time(at(9, 15)));
    }

    #[test]
    fn notifier_defaults_to_console() {
        let notifier = build_notifier(&adapter("[pipeline]\ntickers = AAPL\n")).unwrap();
        assert_eq!(notifier.unwrap().name(), "console");
    }

    #[test]
    fn notifier_none() {
        assert!(build_notifier(&adapter("[notify]\nkind = none\n")).unwrap().is_none());
    }

    #[test]
    fn file_notifier_needs_path() {
        let err = build_notifier(&adapter("[notify]\nkind = file\n")).err().unwrap();
        assert!(matches!(err, PipelineError::ConfigMissing { ref key, .. } if key == "path"));
    }

    #[cfg(not(feature = "telegram"))]
    #[test]
    fn telegram_without_feature_is_invalid() {
        let config = adapter("[notify]\nkind = telegram\ntelegram_bot_token = t\ntelegram_chat_id = 1\n");
        assert!(matches!(build_notifier(&config), Err(PipelineError::ConfigInvalid { .. })));
    }

    #[test]
    fn trade_log_can_be_disabled() {
        assert!(build_trade_log(&adapter("[trade_log]\nenabled = false\n")).is_none());
        let log = build_trade_log(&adapter("[trade_log]\npath = out/log.csv\n")).unwrap();
        assert_eq!(log.path(), &PathBuf::from("out/log.csv"));
    }

    #[test]
    fn empty_run_succeeds() {
        assert_eq!(outcomes_exit_code(&[]), ExitCode::SUCCESS);
    }

    #[test]
    fn all_skipped_uses_error_code() {
        let outcomes = vec![AssetOutcome::Skipped {
            ticker: "AAPL".into(),
            stage: crate::domain::pipeline::Stage::Fetch,
            error: PipelineError::NoData {
                ticker: "AAPL".into(),
            },
        }];
        assert_eq!(outcomes_exit_code(&outcomes), ExitCode::from(5));
    }
}
