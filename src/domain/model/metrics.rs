//! Classification metrics for the held-out tail.

use std::fmt;

/// AUC reported when the real value cannot be computed.
pub const NEUTRAL_AUC: f64 = 0.5;

/// Fraction of matching labels; `None` for empty or misaligned input.
pub fn accuracy(truth: &[u8], predicted: &[u8]) -> Option<f64> {
    if truth.is_empty() || truth.len() != predicted.len() {
        return None;
    }
    let hits = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    Some(hits as f64 / truth.len() as f64)
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
///
/// `None` when both classes are not present or the inputs do not line up.
pub fn roc_auc(truth: &[u8], scores: &[f64]) -> Option<f64> {
    if truth.len() != scores.len() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let positives = truth.iter().filter(|&&t| t == 1).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }

    let rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    let u = rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// [`roc_auc`], falling back to [`NEUTRAL_AUC`].
pub fn auc_or_neutral(truth: &[u8], scores: &[f64]) -> f64 {
    roc_auc(truth, scores).unwrap_or(NEUTRAL_AUC)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision and recall, index 0 and 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationSummary {
    pub classes: [ClassScores; 2],
}

impl ClassificationSummary {
    pub fn new(truth: &[u8], predicted: &[u8]) -> Self {
        let score = |class: u8| {
            let tp = truth
                .iter()
                .zip(predicted)
                .filter(|(t, p)| **t == class && **p == class)
                .count() as f64;
            let predicted_n = predicted.iter().filter(|&&p| p == class).count() as f64;
            let support = truth.iter().filter(|&&t| t == class).count();
            let precision = if predicted_n > 0.0 { tp / predicted_n } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassScores {
                precision,
                recall,
                f1,
                support,
            }
        };
        Self {
            classes: [score(0), score(1)],
        }
    }
}

impl fmt::Display for ClassificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "class  precision  recall  f1-score  support")?;
        for (class, s) in self.classes.iter().enumerate() {
            writeln!(
                f,
                "{:>5}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}",
                class, s.precision, s.recall, s.f1, s.support
            )?;
        }
        Ok(())
    }
}

/// Names paired with importances, highest first, cut to `k`.
pub fn top_features(names: &[&str], importances: &[f64], k: usize) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = names
        .iter()
        .zip(importances)
        .map(|(n, v)| (n.to_string(), *v))
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.truncate(k);
    pairs
}
