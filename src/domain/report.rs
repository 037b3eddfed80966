//! Trade-log records and notification text.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::backtest::BacktestSummary;
use crate::domain::model::{ModelKind, TrainingReport};
use crate::domain::signal::SignalRule;

pub const NOT_AVAILABLE: &str = "N/A";

/// One line of the trade log. ML fields are `None` when training was skipped
/// or failed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLogRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub total_return_pct: f64,
    pub win_ratio_pct: f64,
    pub accuracy_pct: Option<f64>,
    pub auc: Option<f64>,
    pub model: Option<ModelKind>,
}

/// Text form of a [`TradeLogRecord`], as written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeLogRow {
    pub date: String,
    pub ticker: String,
    pub total_return: String,
    pub win_ratio: String,
    pub ml_accuracy: String,
    pub auc: String,
    pub model: String,
}

impl TradeLogRecord {
    pub fn new(
        date: NaiveDate,
        ticker: &str,
        summary: &BacktestSummary,
        training: Option<&TrainingReport>,
    ) -> Self {
        Self {
            date,
            ticker: ticker.to_string(),
            total_return_pct: summary.total_return * 100.0,
            win_ratio_pct: summary.win_ratio * 100.0,
            accuracy_pct: training.map(|t| t.accuracy * 100.0),
            auc: training.map(|t| t.auc),
            model: training.map(|t| t.kind),
        }
    }

    pub fn accuracy_text(&self) -> String {
        self.accuracy_pct
            .map(|a| format!("{:.2}%", a))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn auc_text(&self) -> String {
        self.auc
            .map(|a| format!("{:.3}", a))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn model_text(&self) -> String {
        self.model
            .map(|m| m.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn to_row(&self) -> TradeLogRow {
        TradeLogRow {
            date: self.date.format("%Y-%m-%d").to_string(),
            ticker: self.ticker.clone(),
            total_return: format!("{:.2}%", self.total_return_pct),
            win_ratio: format!("{:.2}%", self.win_ratio_pct),
            ml_accuracy: self.accuracy_text(),
            auc: self.auc_text(),
            model: self.model_text(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

impl SignalStrength {
    /// Strong above 0.65, weak below 0.55, moderate otherwise or when unknown.
    pub fn from_auc(auc: Option<f64>) -> Self {
        match auc {
            Some(a) if a > 0.65 => SignalStrength::Strong,
            Some(a) if a < 0.55 => SignalStrength::Weak,
            _ => SignalStrength::Moderate,
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStrength::Strong => write!(f, "Strong Signal"),
            SignalStrength::Moderate => write!(f, "Moderate Signal"),
            SignalStrength::Weak => write!(f, "Weak Signal"),
        }
    }
}

pub fn format_notification(record: &TradeLogRecord, rule: &SignalRule) -> String {
    format!(
        "Algo-Trading Signal ({date})\n\
         \n\
         Stock: {ticker}\n\
         Strategy: {rule}\n\
         Backtest Return: {ret:.2}%\n\
         Win Ratio: {win:.2}%\n\
         ML Accuracy: {acc}\n\
         ML AUC Score: {auc}\n\
         Model Used: {model}\n\
         \n\
         {strength}",
        date = record.date.format("%d %B %Y"),
        ticker = record.ticker,
        rule = rule,
        ret = record.total_return_pct,
        win = record.win_ratio_pct,
        acc = record.accuracy_text(),
        auc = record.auc_text(),
        model = record.model_text(),
        strength = SignalStrength::from_auc(record.auc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SimpleReason;

    fn summary() -> BacktestSummary {
        BacktestSummary {
            total_return: 0.1234,
            win_ratio: 0.55,
            trades: 20,
            wins: 11,
        }
    }

    fn training(auc: f64) -> TrainingReport {
        TrainingReport {
            kind: ModelKind::Simple,
            simple_reason: Some(SimpleReason::ClassImbalance),
            accuracy: 0.612,
            auc,
            train_rows: 80,
            test_rows: 20,
            class_counts: (60, 40),
            features: vec!["RSI".into()],
            feature_importance: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 5).unwrap()
    }

    #[test]
    fn row_with_ml_fields() {
        let record = TradeLogRecord::new(day(), "AAPL", &summary(), Some(&training(0.6789)));
        let row = record.to_row();
        assert_eq!(row.date, "2024-07-05");
        assert_eq!(row.total_return, "12.34%");
        assert_eq!(row.win_ratio, "55.00%");
        assert_eq!(row.ml_accuracy, "61.20%");
        assert_eq!(row.auc, "0.679");
        assert_eq!(row.model, "Simple Random Forest");
    }

    #[test]
    fn row_without_ml_fields() {
        let row = TradeLogRecord::new(day(), "MSFT", &summary(), None).to_row();
        assert_eq!(row.ml_accuracy, "N/A");
        assert_eq!(row.auc, "N/A");
        assert_eq!(row.model, "N/A");
    }

    #[test]
    fn strength_thresholds() {
        assert_eq!(SignalStrength::from_auc(Some(0.66)), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_auc(Some(0.65)), SignalStrength::Moderate);
        assert_eq!(SignalStrength::from_auc(Some(0.55)), SignalStrength::Moderate);
        assert_eq!(SignalStrength::from_auc(Some(0.54)), SignalStrength::Weak);
        assert_eq!(SignalStrength::from_auc(None), SignalStrength::Moderate);
    }

    #[test]
    fn notification_text() {
        let record = TradeLogRecord::new(day(), "AAPL", &summary(), Some(&training(0.7)));
        let text = format_notification(&record, &SignalRule::default());
        assert!(text.starts_with("Algo-Trading Signal (05 July 2024)"));
        assert!(text.contains("Stock: AAPL"));
        assert!(text.contains("Strategy: RSI < 40 + 20DMA > 50DMA"));
        assert!(text.contains("Backtest Return: 12.34%"));
        assert!(text.contains("ML AUC Score: 0.700"));
        assert!(text.ends_with("Strong Signal"));
    }

    #[test]
    fn notification_without_ml() {
        let record = TradeLogRecord::new(day(), "AAPL", &summary(), None);
        let text = format_notification(&record, &SignalRule::default());
        assert!(text.contains("ML Accuracy: N/A"));
        assert!(text.contains("Model Used: N/A"));
        assert!(text.ends_with("Moderate Signal"));
    }
}
