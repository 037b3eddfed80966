//! Forward-chaining time-series folds.

use std::ops::Range;

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Splits `0..n` into `n_splits` folds whose validation slices are
/// consecutive, equally sized and placed at the end of the range. Each fold
/// trains on everything before its validation slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesSplit {
    pub n_splits: usize,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn split(&self, n: usize) -> Result<Vec<Fold>, PipelineError> {
        if self.n_splits < 2 {
            return Err(PipelineError::model_fitting(format!(
                "need at least 2 folds, got {}",
                self.n_splits
            )));
        }
        let test_size = n / (self.n_splits + 1);
        if test_size == 0 {
            return Err(PipelineError::model_fitting(format!(
                "{} rows is too few for {} folds",
                n, self.n_splits
            )));
        }
        let first = n - self.n_splits * test_size;
        Ok((0..self.n_splits)
            .map(|k| {
                let start = first + k * test_size;
                Fold {
                    train: 0..start,
                    validation: start..start + test_size,
                }
            })
            .collect())
    }
}

/// Number of folds for a training slice of `train_rows` rows.
pub fn fold_count(train_rows: usize) -> usize {
    if train_rows > 100 {
        (train_rows / 20).clamp(2, 5)
    } else {
        3
    }
}
