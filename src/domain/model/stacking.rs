//! Two-level stacked ensemble.
//!
//! A scaled random forest and scaled gradient boosting are the base learners.
//! Their out-of-fold probabilities, taken from time-series folds, train a
//! logistic meta-learner. The base learners are then refitted on every
//! training row.

use tracing::debug;

use crate::domain::error::PipelineError;
use crate::domain::model::boosting::{BoostingParams, GradientBoosting};
use crate::domain::model::cv::TimeSeriesSplit;
use crate::domain::model::forest::{ForestParams, RandomForest};
use crate::domain::model::logistic::LogisticRegression;
use crate::domain::model::scaler::Scaled;
use crate::domain::model::Classifier;

#[derive(Debug, Clone)]
pub struct StackingEnsemble {
    pub forest: Scaled<RandomForest>,
    pub boosting: Scaled<GradientBoosting>,
    pub meta: LogisticRegression,
    cv: TimeSeriesSplit,
}

impl StackingEnsemble {
    pub fn new(forest: ForestParams, boosting: BoostingParams, cv_folds: usize) -> Self {
        Self {
            forest: Scaled::new(RandomForest::new(forest)),
            boosting: Scaled::new(GradientBoosting::new(boosting)),
            meta: LogisticRegression::new(),
            cv: TimeSeriesSplit::new(cv_folds),
        }
    }

    pub fn with_seed(seed: u64, cv_folds: usize) -> Self {
        Self::new(ForestParams::ensemble(seed), BoostingParams::ensemble(seed), cv_folds)
    }

    pub fn cv_folds(&self) -> usize {
        self.cv.n_splits
    }

    fn base_probabilities(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
        let rf = self.forest.predict_proba(x)?;
        let gb = self.boosting.predict_proba(x)?;
        Ok(rf.into_iter().zip(gb).map(|(a, b)| vec![a, b]).collect())
    }

    fn fresh_bases(&self) -> (Scaled<RandomForest>, Scaled<GradientBoosting>) {
        (
            Scaled::new(RandomForest::new(self.forest.model.params())),
            Scaled::new(GradientBoosting::new(self.boosting.model.params())),
        )
    }
}

impl Classifier for StackingEnsemble {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PipelineError> {
        let folds = self.cv.split(x.len())?;

        let mut meta_x = Vec::new();
        let mut meta_y = Vec::new();
        for (k, fold) in folds.iter().enumerate() {
            let (mut rf, mut gb) = self.fresh_bases();
            let train_x = &x[fold.train.clone()];
            let train_y = &y[fold.train.clone()];
            rf.fit(train_x, train_y)?;
            gb.fit(train_x, train_y)?;

            let val_x = &x[fold.validation.clone()];
            let rf_p = rf.predict_proba(val_x)?;
            let gb_p = gb.predict_proba(val_x)?;
            meta_x.extend(rf_p.into_iter().zip(gb_p).map(|(a, b)| vec![a, b]));
            meta_y.extend_from_slice(&y[fold.validation.clone()]);
            debug!(
                fold = k + 1,
                train = fold.train.len(),
                validation = fold.validation.len(),
                "stacking fold fitted"
            );
        }

        self.meta.fit(&meta_x, &meta_y)?;
        self.forest.fit(x, y)?;
        self.boosting.fit(x, y)?;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        let stacked = self.base_probabilities(x)?;
        self.meta.predict_proba(&stacked)
    }
}
