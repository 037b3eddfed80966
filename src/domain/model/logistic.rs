//! L2-regularised logistic regression fitted with Newton's method.
//!
//! Minimises `0.5 * |w|^2 + C * sum(logloss)`; the intercept is not penalised.

use crate::domain::error::PipelineError;
use crate::domain::model::{check_rows, check_training_set, sigmoid, Classifier};

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    weights: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-8,
            weights: Vec::new(),
            intercept: 0.0,
            fitted: false,
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept + row.iter().zip(&self.weights).map(|(a, b)| a * b).sum::<f64>()
    }
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError> {
        let width = check_training_set(x, y)?;
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(PipelineError::model_fitting(
                "logistic regression needs samples of both classes",
            ));
        }
        if self.c <= 0.0 {
            return Err(PipelineError::model_fitting("C must be positive"));
        }

        // last slot is the intercept
        let dim = width + 1;
        let mut theta = vec![0.0; dim];
        for _ in 0..self.max_iter {
            let mut grad = vec![0.0; dim];
            let mut hess = vec![vec![0.0; dim]; dim];
            for (row, &label) in x.iter().zip(y) {
                let z = theta[width] + row.iter().zip(&theta).map(|(a, b)| a * b).sum::<f64>();
                let p = sigmoid(z);
                let w = p * (1.0 - p);
                let residual = p - label as f64;
                for i in 0..dim {
                    let xi = if i == width { 1.0 } else { row[i] };
                    grad[i] += self.c * residual * xi;
                    for j in 0..dim {
                        let xj = if j == width { 1.0 } else { row[j] };
                        hess[i][j] += self.c * w * xi * xj;
                    }
                }
            }
            for i in 0..width {
                grad[i] += theta[i];
                hess[i][i] += 1.0;
            }

            let step = solve(hess, grad)
                .ok_or_else(|| PipelineError::model_fitting("singular Hessian in logistic regression"))?;
            for (t, s) in theta.iter_mut().zip(&step) {
                *t -= s;
            }
            if step.iter().all(|s| s.abs() < self.tol) {
                break;
            }
        }

        if theta.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::model_fitting("logistic regression diverged"));
        }
        self.intercept = theta[width];
        theta.truncate(width);
        self.weights = theta;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::model_fitting("logistic regression used before fit"));
        }
        check_rows(x, self.weights.len())?;
        Ok(x.iter().map(|row| sigmoid(self.decision(row))).collect())
    }
}
