//! Training entry point: gating, model choice, fitting and evaluation.
//!
//! The decision of which model to train is made up front by
//! [`plan_training`], a pure function of the feature frame. Fitting then
//! follows the plan, falling back from the ensemble to the simple forest if
//! the ensemble cannot be fitted.

use std::fmt;

use tracing::{debug, info, warn};

use crate::domain::error::PipelineError;
use crate::domain::features::FeatureFrame;
use crate::domain::model::cv::fold_count;
use crate::domain::model::forest::{ForestParams, RandomForest};
use crate::domain::model::metrics::{accuracy, auc_or_neutral, top_features, ClassificationSummary};
use crate::domain::model::scaler::Scaled;
use crate::domain::model::stacking::StackingEnsemble;
use crate::domain::model::Classifier;

pub const MIN_ROWS: usize = 50;
pub const MIN_FEATURES: usize = 3;
pub const MIN_CLASS_COUNT: usize = 5;
pub const MIN_TRAIN_ROWS: usize = 30;
pub const TEST_FRACTION: f64 = 0.2;
pub const TOP_FEATURES_LOGGED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleReason {
    ClassImbalance,
    SmallTrainingSet,
    EnsembleFailed,
}

impl fmt::Display for SimpleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleReason::ClassImbalance => write!(f, "severe class imbalance"),
            SimpleReason::SmallTrainingSet => write!(f, "training set too small"),
            SimpleReason::EnsembleFailed => write!(f, "ensemble could not be fitted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPlan {
    Ensemble { cv_folds: usize },
    Simple(SimpleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Ensemble,
    Simple,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Ensemble => write!(f, "Stacking Ensemble"),
            ModelKind::Simple => write!(f, "Simple Random Forest"),
        }
    }
}

/// Rows held out at the end of the frame.
pub fn test_rows(n: usize) -> usize {
    (n as f64 * TEST_FRACTION).ceil() as usize
}

/// Rows used for training, taken from the start of the frame.
pub fn train_rows(n: usize) -> usize {
    n - test_rows(n)
}

/// Decides how to train on `frame` without fitting anything.
pub fn plan_training(frame: &FeatureFrame) -> Result<TrainingPlan, PipelineError> {
    let rows = frame.len();
    if rows < MIN_ROWS {
        return Err(PipelineError::InsufficientData {
            rows,
            minimum: MIN_ROWS,
        });
    }

    let available = frame.available_features().len();
    if available < MIN_FEATURES {
        return Err(PipelineError::InsufficientFeatures {
            available,
            minimum: MIN_FEATURES,
        });
    }

    let (negatives, positives) = frame.class_counts();
    if positives < MIN_CLASS_COUNT || negatives < MIN_CLASS_COUNT {
        return Ok(TrainingPlan::Simple(SimpleReason::ClassImbalance));
    }

    // Unreachable while train_rows(MIN_ROWS) >= MIN_TRAIN_ROWS; kept so the
    // gate survives changes to either constant.
    let train = train_rows(rows);
    if train < MIN_TRAIN_ROWS {
        return Ok(TrainingPlan::Simple(SimpleReason::SmallTrainingSet));
    }

    Ok(TrainingPlan::Ensemble {
        cv_folds: fold_count(train),
    })
}

#[derive(Debug, Clone)]
pub enum TrainedClassifier {
    Ensemble(StackingEnsemble),
    Simple(Scaled<RandomForest>),
}

impl TrainedClassifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedClassifier::Ensemble(_) => ModelKind::Ensemble,
            TrainedClassifier::Simple(_) => ModelKind::Simple,
        }
    }

    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        match self {
            TrainedClassifier::Ensemble(model) => model.predict_proba(x),
            TrainedClassifier::Simple(model) => model.predict_proba(x),
        }
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>, PipelineError> {
        match self {
            TrainedClassifier::Ensemble(model) => model.predict(x),
            TrainedClassifier::Simple(model) => model.predict(x),
        }
    }

    /// Importances from the forest (the ensemble's forest base learner).
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            TrainedClassifier::Ensemble(model) => model.forest.model.feature_importances(),
            TrainedClassifier::Simple(model) => model.model.feature_importances(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub kind: ModelKind,
    /// Set when the simple model was trained instead of the ensemble.
    pub simple_reason: Option<SimpleReason>,
    pub accuracy: f64,
    /// ROC AUC on the held-out tail, exactly 0.5 when it cannot be computed.
    pub auc: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    /// (negatives, positives) over the whole frame.
    pub class_counts: (usize, usize),
    pub features: Vec<String>,
    /// Sorted highest first; `None` when unavailable.
    pub feature_importance: Option<Vec<(String, f64)>>,
}

struct Dataset<'a> {
    features: Vec<&'static str>,
    x_train: &'a [Vec<f64>],
    y_train: &'a [u8],
    x_test: &'a [Vec<f64>],
    y_test: &'a [u8],
}

/// Trains and evaluates a classifier on a chronological 80/20 split.
pub fn train_classifier(
    frame: &FeatureFrame,
    seed: u64,
) -> Result<(TrainedClassifier, TrainingReport), PipelineError> {
    let plan = plan_training(frame)?;
    let features = frame.available_features();
    let class_counts = frame.class_counts();
    debug!(
        ticker = %frame.ticker,
        negatives = class_counts.0,
        positives = class_counts.1,
        positive_share = class_counts.1 as f64 / frame.len() as f64,
        "class distribution"
    );
    debug!(count = features.len(), features = ?features, "training features");

    let x = frame.matrix(&features);
    let split = train_rows(x.len());
    let data = Dataset {
        features,
        x_train: &x[..split],
        y_train: &frame.target[..split],
        x_test: &x[split..],
        y_test: &frame.target[split..],
    };

    let (model, simple_reason) = match plan {
        TrainingPlan::Ensemble { cv_folds } => {
            debug!(cv_folds, "training stacking ensemble");
            let mut ensemble = StackingEnsemble::with_seed(seed, cv_folds);
            match ensemble.fit(data.x_train, data.y_train) {
                Ok(()) => (TrainedClassifier::Ensemble(ensemble), None),
                Err(e) => {
                    warn!(ticker = %frame.ticker, error = %e, "ensemble failed, trying simple model");
                    (fit_simple(&data, seed)?, Some(SimpleReason::EnsembleFailed))
                }
            }
        }
        TrainingPlan::Simple(reason) => {
            warn!(ticker = %frame.ticker, %reason, "switching to simple model");
            (fit_simple(&data, seed)?, Some(reason))
        }
    };

    let report = evaluate(&model, &data, simple_reason, class_counts)?;
    info!(
        ticker = %frame.ticker,
        model = %report.kind,
        accuracy = %format!("{:.4}", report.accuracy),
        auc = %format!("{:.4}", report.auc),
        "model trained"
    );
    Ok((model, report))
}

fn fit_simple(data: &Dataset<'_>, seed: u64) -> Result<TrainedClassifier, PipelineError> {
    let mut model = Scaled::new(RandomForest::new(ForestParams::simple(seed)));
    model.fit(data.x_train, data.y_train)?;
    Ok(TrainedClassifier::Simple(model))
}

fn evaluate(
    model: &TrainedClassifier,
    data: &Dataset<'_>,
    simple_reason: Option<SimpleReason>,
    class_counts: (usize, usize),
) -> Result<TrainingReport, PipelineError> {
    let proba = model.predict_proba(data.x_test)?;
    let predicted: Vec<u8> = proba.iter().map(|&p| u8::from(p > 0.5)).collect();
    let accuracy = accuracy(data.y_test, &predicted)
        .ok_or_else(|| PipelineError::model_fitting("empty evaluation set"))?;
    let auc = auc_or_neutral(data.y_test, &proba);

    if data.y_test.iter().any(|&t| t == 0) && data.y_test.iter().any(|&t| t == 1) {
        debug!("classification summary\n{}", ClassificationSummary::new(data.y_test, &predicted));
    }

    let feature_importance = match model.feature_importances() {
        Some(values) if values.len() == data.features.len() => {
            let ranked = top_features(&data.features, &values, data.features.len());
            for (name, value) in ranked.iter().take(TOP_FEATURES_LOGGED) {
                debug!(feature = %name, importance = %format!("{:.4}", value), "top feature");
            }
            Some(ranked)
        }
        _ => {
            warn!("could not extract feature importance");
            None
        }
    };

    Ok(TrainingReport {
        kind: model.kind(),
        simple_reason,
        accuracy,
        auc,
        train_rows: data.x_train.len(),
        test_rows: data.x_test.len(),
        class_counts,
        features: data.features.iter().map(|f| f.to_string()).collect(),
        feature_importance,
    })
}
