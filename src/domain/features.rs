//! Feature engineering for the direction classifier.
//!
//! Expands a backtest frame into the canonical feature columns plus a binary
//! look-ahead `Target`. Every feature column is causal; only the target reads
//! the next bar.
//!
//! Undefined cells (indicator warm-up, flat windows) are handled by an explicit
//! [`FillPolicy`]. `ForwardThenZero` keeps the most rows but is biased: a
//! zero-filled RSI reads as "deeply oversold", which can make RSI-derived
//! features look more predictive than they are. `DropIncomplete` avoids that
//! at the cost of discarding the warm-up rows.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::backtest::BacktestFrame;
use crate::domain::error::PipelineError;
use crate::domain::indicator::{bollinger, calculate_band_position, calculate_roc, macd};
use crate::domain::indicator_helpers::{diff, finite, pct_change, rolling_mean, rolling_std, to_column};

/// Forward one-period return a row must beat to be labelled 1.
pub const TARGET_THRESHOLD: f64 = 0.005;

/// Every feature the trainer knows about, in column order.
pub const FEATURE_NAMES: [&str; 16] = [
    "RSI",
    "20DMA",
    "50DMA",
    "Volume",
    "Price_Change",
    "RollingMean_5",
    "RollingStd_5",
    "MACD",
    "BB_position",
    "RSI_momentum",
    "Volume_ratio",
    "Price_velocity",
    "High_Low_ratio",
    "Close_position",
    "ROC_5",
    "ROC_10",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Forward-fill each column, then replace what is still undefined with 0.
    #[default]
    ForwardThenZero,
    /// Leave gaps alone; rows with any undefined feature are dropped.
    DropIncomplete,
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward_then_zero" | "ffill_zero" => Ok(FillPolicy::ForwardThenZero),
            "drop_incomplete" | "drop" => Ok(FillPolicy::DropIncomplete),
            other => Err(format!(
                "unknown fill policy '{}' (expected forward_then_zero or drop_incomplete)",
                other
            )),
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPolicy::ForwardThenZero => write!(f, "forward_then_zero"),
            FillPolicy::DropIncomplete => write!(f, "drop_incomplete"),
        }
    }
}

/// Feature table that may still hold undefined cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<(&'static str, Vec<Option<f64>>)>,
    pub target: Vec<Option<u8>>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn check_shape(&self) -> Result<(), PipelineError> {
        let n = self.dates.len();
        if self.target.len() != n {
            return Err(PipelineError::FeatureEngineering {
                reason: format!("target has {} rows, expected {}", self.target.len(), n),
            });
        }
        for (name, values) in &self.columns {
            if values.len() != n {
                return Err(PipelineError::FeatureEngineering {
                    reason: format!("column {} has {} rows, expected {}", name, values.len(), n),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<(&'static str, Vec<f64>)>,
    pub target: Vec<u8>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Canonical features present in this frame, in canonical order.
    pub fn available_features(&self) -> Vec<&'static str> {
        FEATURE_NAMES
            .iter()
            .copied()
            .filter(|name| self.column(name).is_some())
            .collect()
    }

    /// Row-major matrix of the named columns; unknown names are skipped.
    pub fn matrix(&self, names: &[&str]) -> Vec<Vec<f64>> {
        let cols: Vec<&[f64]> = names.iter().filter_map(|n| self.column(n)).collect();
        (0..self.len())
            .map(|i| cols.iter().map(|c| c[i]).collect())
            .collect()
    }

    /// (negatives, positives)
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.target.iter().filter(|&&t| t == 1).count();
        (self.target.len() - positives, positives)
    }

    pub fn into_table(self) -> FeatureTable {
        FeatureTable {
            dates: self.dates,
            columns: self
                .columns
                .into_iter()
                .map(|(name, values)| (name, values.into_iter().map(Some).collect()))
                .collect(),
            target: self.target.into_iter().map(Some).collect(),
        }
    }
}

/// Applies the fill policy, then drops every row that still has an undefined
/// feature or no target. Running it over its own output changes nothing.
pub fn fill_and_drop(mut table: FeatureTable, policy: FillPolicy) -> FeatureTable {
    if policy == FillPolicy::ForwardThenZero {
        for (_, values) in table.columns.iter_mut() {
            let mut last = None;
            for cell in values.iter_mut() {
                match cell {
                    Some(v) => last = Some(*v),
                    None => *cell = Some(last.unwrap_or(0.0)),
                }
            }
        }
    }

    let keep: Vec<bool> = (0..table.len())
        .map(|i| {
            table.target[i].is_some()
                && table
                    .columns
                    .iter()
                    .all(|(_, values)| values[i].is_some_and(f64::is_finite))
        })
        .collect();

    let filter = |values: Vec<Option<f64>>| -> Vec<Option<f64>> {
        values
            .into_iter()
            .zip(&keep)
            .filter_map(|(v, &k)| k.then_some(v))
            .collect()
    };

    FeatureTable {
        dates: table
            .dates
            .into_iter()
            .zip(&keep)
            .filter_map(|(d, &k)| k.then_some(d))
            .collect(),
        columns: table
            .columns
            .into_iter()
            .map(|(name, values)| (name, filter(values)))
            .collect(),
        target: table
            .target
            .into_iter()
            .zip(&keep)
            .filter_map(|(t, &k)| k.then_some(t))
            .collect(),
    }
}

/// Computes every feature column and the target without filling gaps.
pub fn build_feature_table(frame: &BacktestFrame, target_threshold: f64) -> FeatureTable {
    let series = frame.series();
    let bars = series.bars();
    let columns_present = series.columns();
    let n = bars.len();

    let closes = to_column(&series.closes());
    let rsi = frame.signals.indicators.rsi.clone();

    let rsi_momentum = if rsi.iter().any(Option::is_some) {
        diff(&rsi)
    } else {
        vec![Some(0.0); n]
    };

    let price_velocity: Vec<Option<f64>> = diff(&closes)
        .iter()
        .enumerate()
        .map(|(i, d)| match (d, i.checked_sub(1).and_then(|p| closes[p])) {
            (Some(d), Some(prev)) if prev != 0.0 => finite(d / prev),
            _ => None,
        })
        .collect();

    let mut columns: Vec<(&'static str, Vec<Option<f64>>)> = vec![
        ("RSI", rsi),
        ("20DMA", frame.signals.indicators.dma_20.clone()),
        ("50DMA", frame.signals.indicators.dma_50.clone()),
    ];

    let volume_ratio = if columns_present.volume {
        let volume = to_column(&bars.iter().map(|b| b.volume).collect::<Vec<_>>());
        let avg = rolling_mean(&volume, 20);
        let ratio = volume
            .iter()
            .zip(&avg)
            .map(|(v, a)| match (v, a) {
                (Some(v), Some(a)) if *a != 0.0 => finite(v / a),
                _ => None,
            })
            .collect();
        columns.push(("Volume", volume));
        ratio
    } else {
        vec![Some(1.0); n]
    };

    let (high_low_ratio, close_position) = if columns_present.high_low {
        (
            bars.iter().map(|b| finite(b.range_ratio())).collect(),
            bars.iter().map(|b| b.close_position()).collect(),
        )
    } else {
        (vec![Some(0.0); n], vec![Some(0.5); n])
    };

    columns.extend([
        ("Price_Change", pct_change(&closes, 1)),
        ("RollingMean_5", rolling_mean(&closes, 5)),
        ("RollingStd_5", rolling_std(&closes, 5)),
        ("MACD", macd::calculate_macd_default(bars).to_options()),
        (
            "BB_position",
            calculate_band_position(bars, bollinger::DEFAULT_PERIOD, bollinger::DEFAULT_MULT_X100)
                .to_options(),
        ),
        ("RSI_momentum", rsi_momentum),
        ("Volume_ratio", volume_ratio),
        ("Price_velocity", price_velocity),
        ("High_Low_ratio", high_low_ratio),
        ("Close_position", close_position),
        ("ROC_5", calculate_roc(bars, 5).to_options()),
        ("ROC_10", calculate_roc(bars, 10).to_options()),
    ]);

    let target = (0..n)
        .map(|i| {
            if i + 1 >= n {
                return None;
            }
            let forward = bars[i + 1].close / bars[i].close - 1.0;
            finite(forward).map(|r| u8::from(r > target_threshold))
        })
        .collect();

    FeatureTable {
        dates: series.dates(),
        columns,
        target,
    }
}

/// Builds the training frame from a backtest frame.
///
/// Fails with `FeatureEngineering` if any column ends up misaligned or a
/// cell survives the drop step undefined; the caller should skip training.
pub fn engineer_features(
    frame: BacktestFrame,
    policy: FillPolicy,
    target_threshold: f64,
) -> Result<FeatureFrame, PipelineError> {
    let table = build_feature_table(&frame, target_threshold);
    table.check_shape()?;
    let table = fill_and_drop(table, policy);
    table.check_shape()?;
    into_frame(frame.ticker().to_string(), table)
}

fn into_frame(ticker: String, table: FeatureTable) -> Result<FeatureFrame, PipelineError> {
    let columns = table
        .columns
        .into_iter()
        .map(|(name, values)| {
            values
                .into_iter()
                .collect::<Option<Vec<f64>>>()
                .map(|v| (name, v))
                .ok_or_else(|| PipelineError::FeatureEngineering {
                    reason: format!("column {} still has undefined values", name),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let target = table
        .target
        .into_iter()
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| PipelineError::FeatureEngineering {
            reason: "target still has undefined values".into(),
        })?;

    Ok(FeatureFrame {
        ticker,
        dates: table.dates,
        columns,
        target,
    })
}
