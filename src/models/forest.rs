//! Native random forest classifier deserialized from the artifact
//!
//! Trees use the flat node-array layout of scikit-learn's `tree_` attribute:
//! node `i` is a leaf when `children_left[i] == -1`, otherwise rows with
//! `x[feature[i]] <= threshold[i]` go to the left child.

use crate::error::{ArtifactLoadError, PredictionError};
use crate::models::artifact::Classifier;
use serde::Deserialize;

const LEAF: i32 = -1;

/// A single decision tree as stored in the artifact
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i32>,
    pub children_right: Vec<i32>,
    pub feature: Vec<i32>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (sample counts or fractions)
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn num_nodes(&self) -> usize {
        self.children_left.len()
    }

    /// Check node arrays for consistency.
    ///
    /// Children must point strictly forward, which also rules out cycles.
    fn validate(
        &self,
        tree_idx: usize,
        n_features: usize,
        n_classes: usize,
    ) -> Result<(), ArtifactLoadError> {
        let invalid = |msg: String| ArtifactLoadError::Invalid(format!("tree {tree_idx}: {msg}"));

        let num_nodes = self.num_nodes();
        if num_nodes == 0 {
            return Err(invalid("tree has no nodes".into()));
        }
        if self.children_right.len() != num_nodes
            || self.feature.len() != num_nodes
            || self.threshold.len() != num_nodes
            || self.value.len() != num_nodes
        {
            return Err(invalid("node arrays have different lengths".into()));
        }

        for node in 0..num_nodes {
            let left = self.children_left[node];
            let right = self.children_right[node];

            if left == LEAF {
                let row = &self.value[node];
                if row.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {node} has {} class weights, expected {n_classes}",
                        row.len()
                    )));
                }
                if row.iter().any(|w| !w.is_finite() || *w < 0.0) || row.iter().sum::<f64>() <= 0.0
                {
                    return Err(invalid(format!("leaf {node} has unusable class weights")));
                }
                continue;
            }

            for child in [left, right] {
                if child <= node as i32 || child as usize >= num_nodes {
                    return Err(invalid(format!(
                        "node {node} references child {child} but tree has {num_nodes} nodes"
                    )));
                }
            }

            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!(
                    "node {node} splits on feature {feature}, model has {n_features} features"
                )));
            }
            if self.threshold[node].is_nan() {
                return Err(invalid(format!("node {node} has a NaN threshold")));
            }
        }

        Ok(())
    }

    /// Class probabilities of the leaf reached by `row`
    fn leaf_probabilities(&self, row: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = row[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }
}

/// Serialized form of the forest inside the artifact's `model` object
#[derive(Debug, Clone, Deserialize)]
pub struct ForestSpec {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

/// Probability-averaging random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Option<Vec<f64>>,
}

impl RandomForest {
    /// Validate a deserialized forest
    pub fn from_spec(spec: ForestSpec) -> Result<Self, ArtifactLoadError> {
        if spec.trees.is_empty() {
            return Err(ArtifactLoadError::Invalid("forest has no trees".into()));
        }
        if spec.n_features == 0 || spec.n_classes == 0 {
            return Err(ArtifactLoadError::Invalid(
                "forest must declare at least one feature and one class".into(),
            ));
        }

        for (idx, tree) in spec.trees.iter().enumerate() {
            tree.validate(idx, spec.n_features, spec.n_classes)?;
        }

        if let Some(importances) = &spec.feature_importances {
            if importances.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactLoadError::Invalid(
                    "feature importances must be finite".into(),
                ));
            }
        }

        Ok(Self {
            n_features: spec.n_features,
            n_classes: spec.n_classes,
            trees: spec.trees,
            feature_importances: spec.feature_importances,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.n_classes)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if row.len() != self.n_features {
            return Err(PredictionError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_probabilities(row)) {
                *acc += p;
            }
        }

        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}
