//! Classifiers used to predict next-period direction.
//!
//! All learners work on row-major `&[Vec<f64>]` matrices and binary `u8`
//! labels, and report the probability of class 1.

pub mod boosting;
pub mod cv;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod scaler;
pub mod stacking;
pub mod trainer;
pub mod tree;

pub use trainer::{
    plan_training, train_classifier, ModelKind, SimpleReason, TrainedClassifier, TrainingPlan,
    TrainingReport,
};

use crate::domain::error::PipelineError;

/// A binary classifier that can be fitted and then scored.
pub trait Classifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError>;

    /// Probability of class 1 for each row.
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError>;

    /// Hard labels; ties go to class 0.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>, PipelineError> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }
}

/// Checks a training set and returns its width.
pub fn check_training_set(x: &[Vec<f64>], y: &[u8]) -> Result<usize, PipelineError> {
    if x.is_empty() {
        return Err(PipelineError::model_fitting("empty training set"));
    }
    if x.len() != y.len() {
        return Err(PipelineError::model_fitting(format!(
            "{} rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(PipelineError::model_fitting(format!("label {} is not binary", bad)));
    }
    check_rows(x, x[0].len())?;
    Ok(x[0].len())
}

/// Checks that every row has `width` finite values.
pub fn check_rows(x: &[Vec<f64>], width: usize) -> Result<(), PipelineError> {
    if width == 0 {
        return Err(PipelineError::model_fitting("rows have no features"));
    }
    for (i, row) in x.iter().enumerate() {
        if row.len() != width {
            return Err(PipelineError::model_fitting(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::model_fitting(format!("row {} has a non-finite value", i)));
        }
    }
    Ok(())
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_set_checks() {
        assert!(check_training_set(&[], &[]).is_err());
        assert!(check_training_set(&[vec![1.0]], &[0, 1]).is_err());
        assert!(check_training_set(&[vec![1.0], vec![2.0, 3.0]], &[0, 1]).is_err());
        assert!(check_training_set(&[vec![f64::NAN]], &[0]).is_err());
        assert!(check_training_set(&[vec![1.0]], &[2]).is_err());
        assert_eq!(check_training_set(&[vec![1.0, 2.0]], &[1]).unwrap(), 2);
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0).is_finite());
    }
}
