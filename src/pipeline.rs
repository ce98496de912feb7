use crate::classifier::{Classifier, ModelBundle};
use crate::collector::AnswerCollector;
use crate::error::{AdvisorError, Result};
use crate::models::{ClassProbability, FeatureVector, PredictionResult, ResponseScale};
use crate::scoring;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Tolerance for a probability distribution that should sum to one
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Turns completed answer sets into career predictions.
///
/// Cloning is cheap: the bundle is shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    bundle: Arc<ModelBundle>,
}

impl Pipeline {
    pub fn new(bundle: ModelBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    /// Load the classifier bundle once for the lifetime of the process
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.ok_or_else(|| {
            AdvisorError::ModelUnavailable("no classifier bundle configured".to_string())
        })?;
        Ok(Self::new(ModelBundle::load(path)?))
    }

    /// Check that the scale produces vectors of the length the model expects
    pub fn ensure_compatible(&self, scale: &ResponseScale) -> Result<()> {
        if scale.bucket_count() != self.bundle.n_features() {
            return Err(AdvisorError::startup(format!(
                "response scale has {} weight buckets but the classifier expects {} features",
                scale.bucket_count(),
                self.bundle.n_features()
            )));
        }
        Ok(())
    }

    /// Count the collector's answers per weight bucket
    pub fn score(&self, collector: &AnswerCollector) -> Result<FeatureVector> {
        scoring::score(collector.answers(), &collector.quiz().scale)
    }

    /// Query the classifier with one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let expected = self.bundle.n_features();
        if features.len() != expected {
            return Err(AdvisorError::prediction(format!(
                "classifier expects {} features, got {}",
                expected,
                features.len()
            )));
        }

        let input = features.to_f64();
        let model = &self.bundle.model;
        let class_index = model.predict(&input)?;
        let label = self.bundle.classes.inverse_transform(class_index)?.to_string();
        let probabilities = match model.predict_proba(&input)? {
            Some(proba) => Some(self.label_probabilities(proba)?),
            None => None,
        };

        debug!(
            "{} predicted class {} for {:?}",
            model.name(),
            class_index,
            features.counts()
        );

        Ok(PredictionResult {
            label,
            class_index,
            features: features.clone(),
            probabilities,
        })
    }

    /// Score a completed collector and predict in one step
    pub fn evaluate(&self, collector: &AnswerCollector) -> Result<PredictionResult> {
        let features = self.score(collector)?;
        debug!(
            "Scored {} answers into {:?}",
            features.total(),
            features.counts()
        );
        let result = self.predict(&features)?;
        info!("Recommended career: {}", result.label);
        Ok(result)
    }

    fn label_probabilities(&self, proba: Vec<f64>) -> Result<Vec<ClassProbability>> {
        let classes = self.bundle.classes.classes();
        if proba.len() != classes.len() {
            return Err(AdvisorError::prediction(format!(
                "classifier returned {} probabilities for {} classes",
                proba.len(),
                classes.len()
            )));
        }

        let sum: f64 = proba.iter().sum();
        if !sum.is_finite() || (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(AdvisorError::prediction(format!(
                "probabilities sum to {} instead of 1",
                sum
            )));
        }

        Ok(classes
            .iter()
            .zip(proba)
            .map(|(label, probability)| ClassProbability {
                label: label.clone(),
                probability,
            })
            .collect())
    }
}
