//! Configuration validation and loading.
//!
//! Every value is checked before a run starts so a bad INI file fails
//! up front instead of halfway through the ticker list.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

use crate::domain::error::PipelineError;
use crate::domain::features::FillPolicy;
use crate::domain::history::HistoryWindow;
use crate::domain::pipeline::{PipelineConfig, DEFAULT_SEED};
use crate::domain::retry::RetryPolicy;
use crate::domain::signal::SignalRule;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SCHEDULE: &str = "09:15";

/// Parses an optional value, keeping `default` when the key is absent.
fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, PipelineError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            PipelineError::config_invalid(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
    }
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<Vec<String>, PipelineError> {
    let tickers = config
        .get_list("pipeline", "tickers")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PipelineError::ConfigMissing {
            section: "pipeline".to_string(),
            key: "tickers".to_string(),
        })?;

    for ticker in &tickers {
        let ok = ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'));
        if !ok {
            return Err(PipelineError::config_invalid(
                "pipeline",
                "tickers",
                format!("'{}' is not a valid ticker", ticker),
            ));
        }
    }
    Ok(tickers.into_iter().map(|t| t.to_uppercase()).collect())
}

fn validate_window(config: &dyn ConfigPort) -> Result<HistoryWindow, PipelineError> {
    let period = config.get_string("pipeline", "period").unwrap_or_else(|| "12mo".into());
    let interval = config.get_string("pipeline", "interval").unwrap_or_else(|| "1d".into());
    HistoryWindow::parse(&period, &interval)
}

fn validate_fill_policy(config: &dyn ConfigPort) -> Result<FillPolicy, PipelineError> {
    match config.get_string("pipeline", "fill_policy") {
        None => Ok(FillPolicy::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| PipelineError::config_invalid("pipeline", "fill_policy", e)),
    }
}

fn validate_rule(config: &dyn ConfigPort) -> Result<SignalRule, PipelineError> {
    let rsi_below = parse_value(config, "pipeline", "rsi_threshold", SignalRule::default().rsi_below)?;
    if !(rsi_below > 0.0 && rsi_below < 100.0) {
        return Err(PipelineError::config_invalid(
            "pipeline",
            "rsi_threshold",
            "rsi_threshold must be between 0 and 100",
        ));
    }
    Ok(SignalRule { rsi_below })
}

fn validate_target_threshold(config: &dyn ConfigPort) -> Result<f64, PipelineError> {
    let value = parse_value(config, "pipeline", "target_threshold", PipelineConfig::default().target_threshold)?;
    if !(0.0..1.0).contains(&value) {
        return Err(PipelineError::config_invalid(
            "pipeline",
            "target_threshold",
            "target_threshold must be in [0, 1)",
        ));
    }
    Ok(value)
}

fn validate_retry(config: &dyn ConfigPort) -> Result<RetryPolicy, PipelineError> {
    let defaults = RetryPolicy::default();
    let attempts: u32 = parse_value(config, "retry", "attempts", defaults.attempts)?;
    if attempts == 0 {
        return Err(PipelineError::config_invalid("retry", "attempts", "attempts must be at least 1"));
    }
    let delay: f64 = parse_value(config, "retry", "delay_secs", defaults.delay.as_secs_f64())?;
    let delay = Duration::try_from_secs_f64(delay)
        .map_err(|_| PipelineError::config_invalid("retry", "delay_secs", "delay_secs must be non-negative"))?;
    Ok(RetryPolicy { attempts, delay })
}

/// Parses an `HH:MM` wall-clock time.
pub fn parse_schedule_time(raw: &str) -> Result<NaiveTime, PipelineError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| PipelineError::config_invalid("schedule", "at", format!("'{}' is not HH:MM", raw.trim())))
}

pub fn schedule_time(config: &dyn ConfigPort) -> Result<NaiveTime, PipelineError> {
    parse_schedule_time(&config.get_string("schedule", "at").unwrap_or_else(|| DEFAULT_SCHEDULE.into()))
}

fn validate_notify(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let kind = config.get_string("notify", "kind").unwrap_or_else(|| "console".into());
    let required: &[&str] = match kind.trim().to_lowercase().as_str() {
        "console" | "stdout" | "none" | "off" => &[],
        "file" => &["path"],
        "telegram" => &["telegram_bot_token", "telegram_chat_id"],
        other => {
            return Err(PipelineError::config_invalid(
                "notify",
                "kind",
                format!("unknown notifier '{}'", other),
            ));
        }
    };
    for key in required {
        match config.get_string("notify", key) {
            Some(v) if !v.trim().is_empty() => {}
            _ => {
                return Err(PipelineError::ConfigMissing {
                    section: "notify".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Checks every section without building anything.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    pipeline_config(config)?;
    validate_notify(config)?;
    schedule_time(config)?;
    Ok(())
}

/// Builds the run configuration from the `[pipeline]` and `[retry]` sections.
pub fn pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, PipelineError> {
    let seed = parse_value(config, "pipeline", "seed", DEFAULT_SEED)?;
    Ok(PipelineConfig {
        tickers: validate_tickers(config)?,
        window: validate_window(config)?,
        rule: validate_rule(config)?,
        fill_policy: validate_fill_policy(config)?,
        target_threshold: validate_target_threshold(config)?,
        seed,
        retry: validate_retry(config)?,
    })
}
