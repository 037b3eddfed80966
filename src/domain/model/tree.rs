//! Binary decision trees.
//!
//! [`DecisionTree`] is a CART classifier split on Gini impurity and used by the
//! random forest. [`GradientTree`] is a regression tree fitted on first and
//! second order gradients, used by gradient boosting. Both store their nodes
//! in a flat arena and send `value <= threshold` to the left child.

use rand::rngs::StdRng;
use rand::seq::index;

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

fn walk(nodes: &[Node], row: &[f64]) -> f64 {
    let mut at = 0;
    loop {
        match &nodes[at] {
            Node::Leaf { value } => return *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                at = if row[*feature] <= *threshold { *left } else { *right };
            }
        }
    }
}

fn sorted_by_feature(x: &[Vec<f64>], idx: &[usize], feature: usize) -> Vec<usize> {
    let mut order = idx.to_vec();
    order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
    order
}

fn gini(n: f64, positives: f64) -> f64 {
    if n == 0.0 {
        return 0.0;
    }
    let p = positives / n;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features tried per split; `None` tries all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            importances: Vec::new(),
        }
    }

    /// Fits on the rows named by `idx`; repeated indices act as sample weights.
    pub fn fit(
        &mut self,
        x: &[Vec<f64>],
        y: &[u8],
        idx: &[usize],
        rng: &mut StdRng,
    ) -> Result<(), PipelineError> {
        if idx.is_empty() {
            return Err(PipelineError::model_fitting("tree fitted on no rows"));
        }
        let width = x.first().map(Vec::len).unwrap_or(0);
        self.nodes.clear();
        self.importances = vec![0.0; width];
        self.grow(x, y, idx.to_vec(), 0, rng);

        let total: f64 = self.importances.iter().sum();
        if total > 0.0 {
            for v in self.importances.iter_mut() {
                *v /= total;
            }
        }
        Ok(())
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[u8], idx: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let n = idx.len() as f64;
        let positives = idx.iter().filter(|&&i| y[i] == 1).count() as f64;
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: positives / n });

        let impurity = gini(n, positives);
        if depth >= self.params.max_depth || idx.len() < self.params.min_samples_split || impurity == 0.0 {
            return id;
        }

        let Some(split) = self.best_split(x, y, &idx, impurity, rng) else {
            return id;
        };

        self.importances[split.feature] += n * impurity - split.score;
        let left = self.grow(x, y, split.left, depth + 1, rng);
        let right = self.grow(x, y, split.right, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Lowest weighted child impurity (`n_l * gini_l + n_r * gini_r`) that
    /// improves on the parent.
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[u8],
        idx: &[usize],
        impurity: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let width = x[idx[0]].len();
        let features = match self.params.max_features {
            Some(k) if k < width => index::sample(rng, width, k.max(1)).into_vec(),
            _ => (0..width).collect(),
        };

        let n = idx.len() as f64;
        let total_pos = idx.iter().filter(|&&i| y[i] == 1).count() as f64;
        let mut best: Option<(usize, f64, f64, Vec<usize>, usize)> = None;

        for feature in features {
            let order = sorted_by_feature(x, idx, feature);
            let mut left_pos = 0.0;
            for k in 0..order.len() - 1 {
                if y[order[k]] == 1 {
                    left_pos += 1.0;
                }
                let here = x[order[k]][feature];
                let next = x[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let left_n = (k + 1) as f64;
                let right_n = n - left_n;
                let score = left_n * gini(left_n, left_pos) + right_n * gini(right_n, total_pos - left_pos);
                if score < n * impurity - 1e-12 && best.as_ref().is_none_or(|b| score < b.2) {
                    best = Some((feature, (here + next) / 2.0, score, order.clone(), k + 1));
                }
            }
        }

        best.map(|(feature, threshold, score, mut order, cut)| {
            let right = order.split_off(cut);
            SplitCandidate {
                feature,
                threshold,
                score,
                left: order,
                right,
            }
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.nodes.is_empty() {
            return 0.5;
        }
        walk(&self.nodes, row)
    }

    /// Impurity decrease per feature, normalised to sum to 1 (all zeros for a stump).
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth_of(nodes, *left).max(depth_of(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { depth_of(&self.nodes, 0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientTreeParams {
    pub max_depth: usize,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
}

impl Default for GradientTreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

/// Regression tree with Newton leaf weights `-G / (H + lambda)`.
#[derive(Debug, Clone)]
pub struct GradientTree {
    params: GradientTreeParams,
    nodes: Vec<Node>,
}

impl GradientTree {
    pub fn new(params: GradientTreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], grad: &[f64], hess: &[f64], idx: &[usize]) -> Result<(), PipelineError> {
        if idx.is_empty() {
            return Err(PipelineError::model_fitting("tree fitted on no rows"));
        }
        if grad.len() != x.len() || hess.len() != x.len() {
            return Err(PipelineError::model_fitting("gradient length does not match rows"));
        }
        self.nodes.clear();
        self.grow(x, grad, hess, idx.to_vec(), 0);
        Ok(())
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn grow(&mut self, x: &[Vec<f64>], grad: &[f64], hess: &[f64], idx: Vec<usize>, depth: usize) -> usize {
        let g: f64 = idx.iter().map(|&i| grad[i]).sum();
        let h: f64 = idx.iter().map(|&i| hess[i]).sum();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: -g / (h + self.params.lambda),
        });

        if depth >= self.params.max_depth || idx.len() < 2 {
            return id;
        }

        let parent = self.score(g, h);
        let width = x[idx[0]].len();
        let mut best: Option<(usize, f64, f64, Vec<usize>, usize)> = None;

        for feature in 0..width {
            let order = sorted_by_feature(x, &idx, feature);
            let (mut gl, mut hl) = (0.0, 0.0);
            for k in 0..order.len() - 1 {
                gl += grad[order[k]];
                hl += hess[order[k]];
                let here = x[order[k]][feature];
                let next = x[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent);
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.2) {
                    best = Some((feature, (here + next) / 2.0, gain, order.clone(), k + 1));
                }
            }
        }

        let Some((feature, threshold, _, mut left_idx, cut)) = best else {
            return id;
        };
        let right_idx = left_idx.split_off(cut);
        let left = self.grow(x, grad, hess, left_idx, depth + 1);
        let right = self.grow(x, grad, hess, right_idx, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        walk(&self.nodes, row)
    }
}
