//! Pre-trained classifiers loaded from a serialized bundle.
//!
//! A bundle is a JSON document holding the model parameters together with the
//! label encoder that turns class indices into career names:
//!
//! ```json
//! {
//!   "feature_names": ["strongly_yes", "yes", "no", "strongly_no"],
//!   "classes": ["Data Scientist", "Software Developer"],
//!   "model": { "kind": "nearest_centroid", "centroids": [[4, 2, 1, 1], [1, 1, 3, 3]] }
//! }
//! ```
//!
//! Training happens offline; this module only evaluates.

use crate::error::{AdvisorError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Read-only prediction capability shared across sessions.
pub trait Classifier: Send + Sync {
    /// Predict the class index for a feature vector.
    fn predict(&self, features: &[f64]) -> Result<usize>;

    /// Per-class probabilities in class index order, if the model provides them.
    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>>;

    /// Model name for logging.
    fn name(&self) -> &str;
}

/// Maps class indices to human-readable labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                AdvisorError::prediction(format!(
                    "class index {} is outside the {} known labels",
                    index,
                    self.classes.len()
                ))
            })
    }
}

/// Node of a fitted decision tree. Nodes without a `feature` are leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    /// Training samples per class that reached this node
    #[serde(default)]
    pub value: Vec<f64>,
}

/// Decision tree in flat array form; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf_for(&self, features: &[f64]) -> Result<&TreeNode> {
        let mut index = 0;
        // a valid path visits each node at most once
        for _ in 0..self.nodes.len() {
            let node = &self.nodes[index];
            let Some(feature) = node.feature else {
                return Ok(node);
            };
            let value = features.get(feature).ok_or_else(|| {
                AdvisorError::prediction(format!("tree splits on missing feature {}", feature))
            })?;
            let next = if *value <= node.threshold {
                node.left
            } else {
                node.right
            };
            index = next.ok_or_else(|| {
                AdvisorError::prediction(format!("split node {} has no child", index))
            })?;
        }
        Err(AdvisorError::prediction("decision tree contains a cycle"))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(AdvisorError::startup("decision tree has no nodes"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node.feature {
                Some(feature) => {
                    if feature >= n_features {
                        return Err(AdvisorError::startup(format!(
                            "node {} splits on feature {} but only {} exist",
                            i, feature, n_features
                        )));
                    }
                    for child in [node.left, node.right] {
                        match child {
                            Some(c) if c < self.nodes.len() => {}
                            _ => {
                                return Err(AdvisorError::startup(format!(
                                    "node {} has a missing or out-of-range child",
                                    i
                                )));
                            }
                        }
                    }
                }
                None => {
                    if node.value.len() != n_classes {
                        return Err(AdvisorError::startup(format!(
                            "leaf {} has {} class counts, expected {}",
                            i,
                            node.value.len(),
                            n_classes
                        )));
                    }
                    let total: f64 = node.value.iter().sum();
                    if node.value.iter().any(|v| *v < 0.0) || total <= 0.0 {
                        return Err(AdvisorError::startup(format!(
                            "leaf {} has no positive class counts",
                            i
                        )));
                    }
                }
            }
        }
        self.check_acyclic()
    }

    /// Every node must be reachable from the root along exactly one path.
    fn check_acyclic(&self) -> Result<()> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return Err(AdvisorError::startup(format!(
                    "node {} is reached more than once; the tree has a cycle or shared subtree",
                    index
                )));
            }
            visited[index] = true;
            let node = &self.nodes[index];
            if node.feature.is_some() {
                stack.extend(node.left.into_iter().chain(node.right));
            }
        }
        Ok(())
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, features: &[f64]) -> Result<usize> {
        let leaf = self.leaf_for(features)?;
        Ok(argmax(&leaf.value))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>> {
        let leaf = self.leaf_for(features)?;
        let total: f64 = leaf.value.iter().sum();
        Ok(Some(leaf.value.iter().map(|v| v / total).collect()))
    }

    fn name(&self) -> &str {
        "decision_tree"
    }
}

/// Linear model with one coefficient row per class (softmax), or a single
/// row for a two-class problem (sigmoid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticRegression {
    fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    fn probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        let n_features = self.coefficients.first().map(Vec::len).unwrap_or(0);
        if features.len() != n_features {
            return Err(AdvisorError::prediction(format!(
                "expected {} features, got {}",
                n_features,
                features.len()
            )));
        }

        let scores = self.decision_function(features);
        if scores.len() == 1 {
            let positive = 1.0 / (1.0 + (-scores[0]).exp());
            return Ok(vec![1.0 - positive, positive]);
        }
        Ok(softmax(&scores))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if n_classes < 2 {
            return Err(AdvisorError::startup(
                "logistic regression needs at least two classes",
            ));
        }
        let rows = self.coefficients.len();
        let expected_rows = if n_classes == 2 && rows == 1 { 1 } else { n_classes };
        if rows != expected_rows || self.intercepts.len() != rows {
            return Err(AdvisorError::startup(format!(
                "logistic regression has {} coefficient rows and {} intercepts for {} classes",
                rows,
                self.intercepts.len(),
                n_classes
            )));
        }
        if let Some(row) = self.coefficients.iter().find(|r| r.len() != n_features) {
            return Err(AdvisorError::startup(format!(
                "coefficient row has {} weights, expected {}",
                row.len(),
                n_features
            )));
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[f64]) -> Result<usize> {
        Ok(argmax(&self.probabilities(features)?))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>> {
        self.probabilities(features).map(Some)
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

/// Assigns the class whose centroid is closest. Has no probability output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestCentroid {
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.centroids.len() != n_classes {
            return Err(AdvisorError::startup(format!(
                "{} centroids for {} classes",
                self.centroids.len(),
                n_classes
            )));
        }
        if self.centroids.iter().any(|c| c.len() != n_features) {
            return Err(AdvisorError::startup(format!(
                "every centroid must have {} coordinates",
                n_features
            )));
        }
        Ok(())
    }
}

impl Classifier for NearestCentroid {
    fn predict(&self, features: &[f64]) -> Result<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, centroid) in self.centroids.iter().enumerate() {
            if centroid.len() != features.len() {
                return Err(AdvisorError::prediction(format!(
                    "expected {} features, got {}",
                    centroid.len(),
                    features.len()
                )));
            }
            let distance: f64 = centroid
                .iter()
                .zip(features)
                .map(|(c, x)| (c - x).powi(2))
                .sum();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
            .ok_or_else(|| AdvisorError::prediction("no centroids"))
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<Option<Vec<f64>>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "nearest_centroid"
    }
}

/// Fitted model parameters, tagged by model kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    DecisionTree(DecisionTree),
    LogisticRegression(LogisticRegression),
    NearestCentroid(NearestCentroid),
}

impl Model {
    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Model::DecisionTree(m) => m,
            Model::LogisticRegression(m) => m,
            Model::NearestCentroid(m) => m,
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        match self {
            Model::DecisionTree(m) => m.validate(n_features, n_classes),
            Model::LogisticRegression(m) => m.validate(n_features, n_classes),
            Model::NearestCentroid(m) => m.validate(n_features, n_classes),
        }
    }
}

impl Classifier for Model {
    fn predict(&self, features: &[f64]) -> Result<usize> {
        self.as_classifier().predict(features)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>> {
        self.as_classifier().predict_proba(features)
    }

    fn name(&self) -> &str {
        self.as_classifier().name()
    }
}

/// Trained classifier plus its label encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// One name per feature slot; fixes the expected vector length
    pub feature_names: Vec<String>,
    /// Label encoder, class index order
    pub classes: LabelEncoder,
    pub model: Model,
}

impl ModelBundle {
    /// Load and validate a bundle. Any failure is a startup failure.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdvisorError::startup(format!(
                "cannot read classifier bundle {}: {}",
                path.display(),
                e
            ))
        })?;
        let bundle = Self::from_json(&content).map_err(|e| match e {
            AdvisorError::StartupFailure(msg) => {
                AdvisorError::startup(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        info!(
            "Loaded {} classifier from {} ({} features, {} classes)",
            bundle.model.name(),
            path.display(),
            bundle.n_features(),
            bundle.classes.len()
        );
        Ok(bundle)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let bundle: Self = serde_json::from_str(content)
            .map_err(|e| AdvisorError::startup(format!("malformed classifier bundle: {}", e)))?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(AdvisorError::startup("bundle declares no features"));
        }
        if self.classes.is_empty() {
            return Err(AdvisorError::startup("label encoder has no classes"));
        }
        debug!(
            "Validating {} model for {} classes",
            self.model.name(),
            self.classes.len()
        );
        self.model.validate(self.n_features(), self.classes.len())
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Index of the largest value; ties go to the lowest index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
