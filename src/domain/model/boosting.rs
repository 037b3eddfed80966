//! Gradient-boosted trees on the logistic loss.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::PipelineError;
use crate::domain::model::tree::{GradientTree, GradientTreeParams};
use crate::domain::model::{check_rows, check_training_set, sigmoid, Classifier};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub tree: GradientTreeParams,
    /// Fraction of rows drawn for each round; 1.0 uses every row.
    pub subsample: f64,
    pub seed: u64,
}

impl BoostingParams {
    pub fn ensemble(seed: u64) -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: GradientTreeParams {
                max_depth: 6,
                lambda: 1.0,
                min_child_weight: 1.0,
            },
            subsample: 1.0,
            seed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoosting {
    params: BoostingParams,
    base_margin: f64,
    trees: Vec<GradientTree>,
    width: usize,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_margin: 0.0,
            trees: Vec::new(),
            width: 0,
        }
    }

    pub fn params(&self) -> BoostingParams {
        self.params
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|t| self.params.learning_rate * t.predict_row(row))
                .sum::<f64>()
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError> {
        let width = check_training_set(x, y)?;
        if !(self.params.subsample > 0.0 && self.params.subsample <= 1.0) {
            return Err(PipelineError::model_fitting(format!(
                "subsample {} outside (0, 1]",
                self.params.subsample
            )));
        }
        let n = x.len();
        let mean = y.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let prior = mean.clamp(1e-6, 1.0 - 1e-6);
        self.base_margin = (prior / (1.0 - prior)).ln();
        self.trees.clear();
        self.width = width;

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut margins = vec![self.base_margin; n];
        let all: Vec<usize> = (0..n).collect();

        for _ in 0..self.params.n_rounds {
            let mut grad = Vec::with_capacity(n);
            let mut hess = Vec::with_capacity(n);
            for (m, &label) in margins.iter().zip(y) {
                let p = sigmoid(*m);
                grad.push(p - label as f64);
                hess.push((p * (1.0 - p)).max(1e-16));
            }

            let rows = if self.params.subsample < 1.0 {
                let sample: Vec<usize> = all
                    .iter()
                    .copied()
                    .filter(|_| rng.gen_range(0.0..1.0) < self.params.subsample)
                    .collect();
                if sample.is_empty() { all.clone() } else { sample }
            } else {
                all.clone()
            };

            let mut tree = GradientTree::new(self.params.tree);
            tree.fit(x, &grad, &hess, &rows)?;
            for (m, row) in margins.iter_mut().zip(x) {
                *m += self.params.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        if self.width == 0 {
            return Err(PipelineError::model_fitting("boosting used before fit"));
        }
        check_rows(x, self.width)?;
        Ok(x.iter().map(|row| sigmoid(self.margin(row))).collect())
    }
}
