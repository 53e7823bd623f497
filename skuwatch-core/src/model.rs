//! Fitted classifiers.
//!
//! Trees use the flat array layout exported by scikit-learn: node `i` is a
//! leaf when `children_left[i] == -1`, otherwise the row goes left when
//! `row[feature[i]] <= threshold[i]`. Scikit-learn evaluates splits on
//! `float32` inputs, so feature values are rounded to `f32` before the
//! comparison; a value a hair above a threshold in `f64` can still go left.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

const TREE_LEAF: i64 = -1;

/// Feature value as the tree saw it during training.
fn split_value(x: f64) -> f64 {
    x as f32 as f64
}

/// A single CART tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions).
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, index: usize, n_features: usize, n_classes: usize) -> Result<(), ModelError> {
        let invalid = |reason: String| ModelError::InvalidTree { index, reason };
        let n = self.node_count();
        if n == 0 {
            return Err(invalid("tree has no nodes".into()));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(invalid("node arrays have different lengths".into()));
        }
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == TREE_LEAF {
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {node} has {} class weights, expected {n_classes}",
                        weights.len()
                    )));
                }
                if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
                    return Err(invalid(format!("leaf {node} has class weight {w}")));
                }
                if weights.iter().sum::<f64>() <= 0.0 {
                    return Err(invalid(format!("leaf {node} has no weight")));
                }
                continue;
            }
            // Children always follow their parent, which rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(invalid(format!("node {node} has invalid child {child}")));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!(
                    "node {node} splits on feature {feature}, only {n_features} available"
                )));
            }
            if !self.threshold[node].is_finite() {
                return Err(invalid(format!("node {node} has a non-finite threshold")));
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `row`.
    ///
    /// Malformed trees produce an error rather than a panic, so a tree that
    /// skipped validation cannot take the process down.
    pub fn leaf_distribution(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        let malformed = |node: usize| ModelError::Invalid {
            reason: format!("tree walk reached malformed node {node}"),
        };
        let mut node = 0usize;
        // A well-formed walk only moves to higher indices.
        for _ in 0..=self.node_count() {
            let left = *self.children_left.get(node).ok_or_else(|| malformed(node))?;
            if left == TREE_LEAF {
                let weights = self.value.get(node).ok_or_else(|| malformed(node))?;
                let total: f64 = weights.iter().sum();
                return Ok(weights.iter().map(|w| w / total).collect());
            }
            let (Some(&right), Some(&feature), Some(&threshold)) = (
                self.children_right.get(node),
                self.feature.get(node),
                self.threshold.get(node),
            ) else {
                return Err(malformed(node));
            };
            let feature = usize::try_from(feature).map_err(|_| malformed(node))?;
            let x = *row.get(feature).ok_or(ModelError::FeatureCount {
                expected: feature + 1,
                actual: row.len(),
            })?;
            let next = if split_value(x) <= threshold { left } else { right };
            node = usize::try_from(next).map_err(|_| malformed(node))?;
        }
        Err(malformed(node))
    }
}

/// A fitted classifier over integer-coded class labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    DecisionTree {
        classes: Vec<i64>,
        tree: DecisionTree,
    },
    RandomForest {
        classes: Vec<i64>,
        trees: Vec<DecisionTree>,
    },
    LogisticRegression {
        classes: Vec<i64>,
        /// One row per class, or a single row for binary problems.
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
}

impl Classifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DecisionTree { .. } => "decision_tree",
            Self::RandomForest { .. } => "random_forest",
            Self::LogisticRegression { .. } => "logistic_regression",
        }
    }

    pub fn classes(&self) -> &[i64] {
        match self {
            Self::DecisionTree { classes, .. }
            | Self::RandomForest { classes, .. }
            | Self::LogisticRegression { classes, .. } => classes,
        }
    }

    /// Check structural consistency against the feature column count.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let n_classes = self.classes().len();
        if n_classes == 0 {
            return Err(ModelError::NoClasses);
        }
        match self {
            Self::DecisionTree { tree, .. } => tree.validate(0, n_features, n_classes),
            Self::RandomForest { trees, .. } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid {
                        reason: "random forest has no trees".into(),
                    });
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| t.validate(i, n_features, n_classes))
            }
            Self::LogisticRegression {
                coef, intercept, ..
            } => {
                let expected_rows = if n_classes == 2 { 1 } else { n_classes };
                if coef.len() != expected_rows || intercept.len() != expected_rows {
                    return Err(ModelError::Invalid {
                        reason: format!(
                            "expected {expected_rows} coefficient rows for {n_classes} classes, got {} (intercepts: {})",
                            coef.len(),
                            intercept.len()
                        ),
                    });
                }
                if let Some(row) = coef.iter().find(|r| r.len() != n_features) {
                    return Err(ModelError::FeatureCount {
                        expected: n_features,
                        actual: row.len(),
                    });
                }
                if !coef.iter().flatten().chain(intercept).all(|v| v.is_finite()) {
                    return Err(ModelError::Invalid {
                        reason: "logistic regression has non-finite coefficients".into(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Probability of each class in [`Classifier::classes`] order.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        match self {
            Self::DecisionTree { tree, .. } => tree.leaf_distribution(row),
            Self::RandomForest { classes, trees } => {
                let mut proba = vec![0.0; classes.len()];
                for tree in trees {
                    for (p, q) in proba.iter_mut().zip(tree.leaf_distribution(row)?) {
                        *p += q;
                    }
                }
                let n = trees.len() as f64;
                Ok(proba.into_iter().map(|p| p / n).collect())
            }
            Self::LogisticRegression {
                coef, intercept, ..
            } => {
                let scores = coef
                    .iter()
                    .zip(intercept)
                    .map(|(w, b)| {
                        if w.len() != row.len() {
                            return Err(ModelError::FeatureCount {
                                expected: w.len(),
                                actual: row.len(),
                            });
                        }
                        Ok(w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                if let Some(score) = scores.iter().find(|s| !s.is_finite()) {
                    return Err(ModelError::NonFinite {
                        reason: format!("decision score {score} overflowed"),
                    });
                }
                if scores.len() == 1 {
                    let p = sigmoid(scores[0]);
                    Ok(vec![1.0 - p, p])
                } else {
                    Ok(softmax(&scores))
                }
            }
        }
    }

    /// Predicted label and its probability. The first maximum wins ties.
    ///
    /// Fails rather than report a probability outside `[0, 1]`.
    pub fn predict_with_confidence(&self, row: &[f64]) -> Result<(i64, f64), ModelError> {
        let proba = self.predict_proba(row)?;
        if let Some(p) = proba.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ModelError::NonFinite {
                reason: format!("class probability {p}"),
            });
        }
        let (best, confidence) = proba
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, p)| {
                if p > bp { (i, p) } else { (bi, bp) }
            });
        if !confidence.is_finite() {
            return Err(ModelError::NonFinite {
                reason: "classifier returned no class probabilities".into(),
            });
        }
        let label = *self.classes().get(best).ok_or(ModelError::NoClasses)?;
        Ok((label, confidence))
    }

    pub fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        self.predict_with_confidence(row).map(|(label, _)| label)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
