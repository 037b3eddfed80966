//! Bagged Gini trees with per-split feature subsampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::PipelineError;
use crate::domain::model::tree::{DecisionTree, TreeParams};
use crate::domain::model::{check_rows, check_training_set, Classifier};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl ForestParams {
    /// Base learner of the stacked ensemble.
    pub fn ensemble(seed: u64) -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 5,
            seed,
        }
    }

    /// Smaller forest used when the ensemble cannot be trained.
    pub fn simple(seed: u64) -> Self {
        Self {
            n_trees: 50,
            max_depth: 5,
            min_samples_split: 2,
            seed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    width: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            width: 0,
        }
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree importances, renormalised. `None` before fit or
    /// when no tree ever split.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.width];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum <= 0.0 {
            return None;
        }
        Some(total.into_iter().map(|v| v / sum).collect())
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError> {
        let width = check_training_set(x, y)?;
        if self.params.n_trees == 0 {
            return Err(PipelineError::model_fitting("forest needs at least one tree"));
        }
        let n = x.len();
        let max_features = ((width as f64).sqrt() as usize).max(1);
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            max_features: Some(max_features),
        };

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let mut tree_rng = StdRng::seed_from_u64(rng.gen_range(0..u64::MAX));
            let sample: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
            let mut tree = DecisionTree::new(tree_params);
            tree.fit(x, y, &sample, &mut tree_rng)?;
            trees.push(tree);
        }

        self.trees = trees;
        self.width = width;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        if self.trees.is_empty() {
            return Err(PipelineError::model_fitting("forest used before fit"));
        }
        check_rows(x, self.width)?;
        let k = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / k)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dataset() -> (Vec<Vec<f64>>, Vec<u8>) {
        // label follows the first column, the others are noise
        let x: Vec<Vec<f64>> = (0..120)
            .map(|i| {
                let i = i as f64;
                vec![(i * 0.37).sin(), (i * 1.3).cos(), (i * 0.11).sin() * 3.0, i % 5.0]
            })
            .collect();
        let y = x.iter().map(|r| u8::from(r[0] > 0.0)).collect();
        (x, y)
    }

    #[test]
    fn learns_informative_feature() {
        let (x, y) = dataset();
        let mut forest = RandomForest::new(ForestParams::ensemble(42));
        forest.fit(&x, &y).unwrap();

        let predicted = forest.predict(&x).unwrap();
        let hits = predicted.iter().zip(&y).filter(|(a, b)| a == b).count();
        assert!(hits as f64 / y.len() as f64 > 0.9);

        let importances = forest.feature_importances().unwrap();
        assert_relative_eq!(importances.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        let top = importances
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(0));
    }

    #[test]
    fn same_seed_same_model() {
        let (x, y) = dataset();
        let mut a = RandomForest::new(ForestParams::simple(42));
        let mut b = RandomForest::new(ForestParams::simple(42));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
        assert_eq!(a.n_trees(), 50);
    }

    #[test]
    fn probabilities_are_bounded() {
        let (x, y) = dataset();
        let mut forest = RandomForest::new(ForestParams::simple(1));
        forest.fit(&x, &y).unwrap();
        assert!(forest
            .predict_proba(&x)
            .unwrap()
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn single_class_still_fits() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![0u8; 10];
        let mut forest = RandomForest::new(ForestParams::simple(42));
        forest.fit(&x, &y).unwrap();
        assert!(forest.predict_proba(&x).unwrap().iter().all(|&p| p == 0.0));
        assert!(forest.feature_importances().is_none());
    }

    #[test]
    fn predict_before_fit_fails() {
        let forest = RandomForest::new(ForestParams::simple(42));
        assert!(forest.predict_proba(&[vec![1.0]]).is_err());
        assert!(forest.feature_importances().is_none());
    }
}
