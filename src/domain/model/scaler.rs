//! Median/IQR scaling and a wrapper that puts it in front of a classifier.

use crate::domain::error::PipelineError;
use crate::domain::model::{check_rows, check_training_set, Classifier};

/// Linear-interpolated quantile of an unsorted sample.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Centres each column on its median and divides by its interquartile range.
/// A column with zero IQR is only centred.
#[derive(Debug, Clone, Default)]
pub struct RobustScaler {
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl RobustScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &[Vec<f64>]) -> Result<(), PipelineError> {
        if x.is_empty() {
            return Err(PipelineError::model_fitting("cannot scale an empty matrix"));
        }
        let width = x[0].len();
        check_rows(x, width)?;

        self.center.clear();
        self.scale.clear();
        for j in 0..width {
            let column: Vec<f64> = x.iter().map(|row| row[j]).collect();
            let median = quantile(&column, 0.5).unwrap_or(0.0);
            let iqr = quantile(&column, 0.75).unwrap_or(0.0) - quantile(&column, 0.25).unwrap_or(0.0);
            self.center.push(median);
            self.scale.push(if iqr == 0.0 { 1.0 } else { iqr });
        }
        Ok(())
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
        if self.center.is_empty() {
            return Err(PipelineError::model_fitting("scaler used before fit"));
        }
        check_rows(x, self.center.len())?;
        Ok(x.iter()
            .map(|row| {
                row.iter()
                    .zip(self.center.iter().zip(&self.scale))
                    .map(|(v, (c, s))| (v - c) / s)
                    .collect()
            })
            .collect())
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

/// A classifier preceded by a [`RobustScaler`].
#[derive(Debug, Clone)]
pub struct Scaled<C> {
    pub scaler: RobustScaler,
    pub model: C,
}

impl<C> Scaled<C> {
    pub fn new(model: C) -> Self {
        Self {
            scaler: RobustScaler::new(),
            model,
        }
    }
}

impl<C: Classifier> Classifier for Scaled<C> {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError> {
        check_training_set(x, y)?;
        self.scaler.fit(x)?;
        let scaled = self.scaler.transform(x)?;
        self.model.fit(&scaled, y)
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        let scaled = self.scaler.transform(x)?;
        self.model.predict_proba(&scaled)
    }
}
