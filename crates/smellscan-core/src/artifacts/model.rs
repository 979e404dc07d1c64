//! Fitted classifiers.
//!
//! The pipeline only depends on the [`Classifier`] trait. [`ClassifierModel`]
//! is the serialized form shipped as `final_model.json`.

use std::fmt;

use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

/// Binary smell label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Clean,
    Smelly,
}

impl Label {
    pub fn as_bit(self) -> u8 {
        match self {
            Label::Clean => 0,
            Label::Smelly => 1,
        }
    }

    pub fn is_smelly(self) -> bool {
        self == Label::Smelly
    }
}

impl From<bool> for Label {
    fn from(smelly: bool) -> Self {
        if smelly { Label::Smelly } else { Label::Clean }
    }
}

/// A fitted decision function over ordered feature vectors.
pub trait Classifier: Send + Sync {
    /// Short identifier for logs and reports.
    fn kind(&self) -> &'static str;

    /// Predicts one label per row. `result[i]` must depend only on
    /// `rows[i]`.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, String>;
}

/// Decision tree in the array layout produced by scikit-learn's `tree_`.
///
/// Node `i` is a leaf when both children are `-1`. Internal nodes route
/// left when `x[feature[i]] <= threshold[i]`. `value[i]` holds the
/// `[negative, positive]` sample weights reaching the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<[f64; 2]>,
}

impl Tree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays have different lengths".to_string());
        }
        for i in 0..n {
            let (l, r) = (self.children_left[i], self.children_right[i]);
            if l == -1 && r == -1 {
                continue;
            }
            let in_range = |c: i64| c > i as i64 && (c as usize) < n;
            if !in_range(l) || !in_range(r) {
                return Err(format!("node {i} has invalid children ({l}, {r})"));
            }
            let f = self.feature[i];
            if f < 0 || f as usize >= n_features {
                return Err(format!(
                    "node {i} splits on feature {f}, model has {n_features}"
                ));
            }
        }
        Ok(())
    }

    /// Shortest row the tree can route: one past the highest split feature.
    fn min_width(&self) -> usize {
        self.children_left
            .iter()
            .zip(&self.feature)
            .filter(|&(&l, _)| l != -1)
            .map(|(_, &f)| f.max(0) as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Fraction of positive samples at the leaf `x` falls into.
    ///
    /// Children always have a larger index than their parent (checked by
    /// `validate`), so traversal terminates.
    fn positive_probability(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let f = self.feature[node] as usize;
            node = if x[f] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [neg, pos] = self.value[node];
        let total = neg + pos;
        if total > 0.0 { pos / total } else { 0.0 }
    }
}

// gbdt works in f32.
fn gbdt_row(x: &[f64]) -> Data {
    Data::new_test_data(x.iter().map(|&v| v as f32).collect(), None)
}

fn default_threshold() -> f64 {
    0.5
}

/// Serialized classifier artifact, tagged by `kind`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    /// Positive when `sigmoid(coef . x + intercept) > threshold`.
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Positive when the leaf's positive fraction is above one half.
    DecisionTree { tree: Tree },
    /// Soft vote: mean per-tree positive fraction above one half.
    RandomForest { trees: Vec<Tree> },
    /// Gradient-boosted trees from the `gbdt` crate (log-likelihood loss),
    /// positive when the predicted probability is at least one half.
    Gbdt { model: GBDT },
}

impl fmt::Debug for ClassifierModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogisticRegression {
                coef,
                intercept,
                threshold,
            } => f
                .debug_struct("LogisticRegression")
                .field("coef", coef)
                .field("intercept", intercept)
                .field("threshold", threshold)
                .finish(),
            Self::DecisionTree { tree } => f
                .debug_struct("DecisionTree")
                .field("nodes", &tree.node_count())
                .finish(),
            Self::RandomForest { trees } => f
                .debug_struct("RandomForest")
                .field("trees", &trees.len())
                .finish(),
            Self::Gbdt { .. } => f.debug_struct("Gbdt").finish_non_exhaustive(),
        }
    }
}

impl ClassifierModel {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid classifier model: {e}"))
    }

    /// Number of input features the model is known to require, if the
    /// model format records it.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Self::LogisticRegression { coef, .. } => Some(coef.len()),
            Self::DecisionTree { .. } | Self::RandomForest { .. } | Self::Gbdt { .. } => None,
        }
    }

    fn min_width(&self) -> usize {
        match self {
            Self::LogisticRegression { coef, .. } => coef.len(),
            Self::DecisionTree { tree } => tree.min_width(),
            Self::RandomForest { trees } => trees.iter().map(Tree::min_width).max().unwrap_or(0),
            Self::Gbdt { .. } => 0,
        }
    }

    /// Checks internal consistency and agreement with the contract length.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Self::LogisticRegression { coef, .. } => {
                if coef.len() != n_features {
                    return Err(format!(
                        "model has {} coefficients, feature list has {n_features}",
                        coef.len()
                    ));
                }
                Ok(())
            }
            Self::DecisionTree { tree } => tree.validate(n_features),
            Self::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| t.validate(n_features).map_err(|e| format!("tree {i}: {e}")))
            }
            Self::Gbdt { .. } => Ok(()),
        }
    }

    fn predict_row(&self, x: &[f64]) -> Label {
        match self {
            Self::LogisticRegression {
                coef,
                intercept,
                threshold,
            } => {
                let z: f64 = coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + intercept;
                let p = 1.0 / (1.0 + (-z).exp());
                Label::from(p > *threshold)
            }
            Self::DecisionTree { tree } => Label::from(tree.positive_probability(x) > 0.5),
            Self::RandomForest { trees } => {
                let mean = trees.iter().map(|t| t.positive_probability(x)).sum::<f64>()
                    / trees.len() as f64;
                Label::from(mean > 0.5)
            }
            Self::Gbdt { model } => {
                let data = vec![gbdt_row(x)];
                let p = model.predict(&data).first().copied().unwrap_or(0.0);
                Label::from(p >= 0.5)
            }
        }
    }
}

impl Classifier for ClassifierModel {
    fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::DecisionTree { .. } => "decision_tree",
            Self::RandomForest { .. } => "random_forest",
            Self::Gbdt { .. } => "gbdt",
        }
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, String> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(n) = self.n_features() {
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
                return Err(format!(
                    "row {i} has {} features, model expects {n}",
                    row.len()
                ));
            }
        }
        let width = self.min_width();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() < width) {
            return Err(format!(
                "row {i} has {} features, model splits on feature {}",
                row.len(),
                width - 1
            ));
        }

        if let Self::Gbdt { model } = self {
            let data: Vec<Data> = rows
                .iter()
                .map(|r| gbdt_row(r))
                .collect();
            let probs = model.predict(&data);
            if probs.len() != rows.len() {
                return Err(format!(
                    "gbdt returned {} predictions for {} rows",
                    probs.len(),
                    rows.len()
                ));
            }
            return Ok(probs.into_iter().map(|p| Label::from(p >= 0.5)).collect());
        }

        Ok(rows.iter().map(|r| self.predict_row(r)).collect())
    }
}
