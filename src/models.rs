use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Index of an option inside a [`ResponseScale`]
pub type OptionId = usize;

/// A single prompt in the quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Zero-based position in the sequence
    pub position: usize,
    /// Prompt shown to the user
    pub text: String,
}

/// One selectable answer and the weight bucket it counts toward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOption {
    pub label: String,
    pub weight: u8,
}

/// Closed set of response options whose weights cover `0..len` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseScale {
    options: Vec<ResponseOption>,
}

impl ResponseScale {
    /// Build a scale, rejecting anything that is not a bijection onto `0..len`.
    pub fn new(mut options: Vec<ResponseOption>) -> Result<Self> {
        if options.len() < 2 {
            return Err(AdvisorError::invalid_scale(
                "a response scale needs at least two options",
            ));
        }
        if options.len() > u8::MAX as usize {
            return Err(AdvisorError::invalid_scale("too many response options"));
        }

        let mut labels = HashSet::new();
        let mut weights = HashSet::new();
        for option in &mut options {
            option.label = option.label.trim().to_string();
        }
        for option in &options {
            let label = normalize_label(&option.label);
            if label.is_empty() {
                return Err(AdvisorError::invalid_scale("option labels cannot be empty"));
            }
            if !labels.insert(label) {
                return Err(AdvisorError::invalid_scale(format!(
                    "duplicate option label '{}'",
                    option.label
                )));
            }
            if option.weight as usize >= options.len() {
                return Err(AdvisorError::invalid_scale(format!(
                    "weight {} of '{}' is outside 0..{}",
                    option.weight,
                    option.label,
                    options.len()
                )));
            }
            if !weights.insert(option.weight) {
                return Err(AdvisorError::invalid_scale(format!(
                    "weight {} is used more than once",
                    option.weight
                )));
            }
        }

        Ok(Self { options })
    }

    /// The four-level scale used by the career quiz. Weight equals position.
    pub fn career_default() -> Self {
        let options = ["Strongly Yes", "Yes", "No", "Strongly No"]
            .iter()
            .enumerate()
            .map(|(i, label)| ResponseOption {
                label: label.to_string(),
                weight: i as u8,
            })
            .collect();
        Self { options }
    }

    pub fn options(&self) -> &[ResponseOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Number of weight buckets, i.e. the feature vector length
    pub fn bucket_count(&self) -> usize {
        self.options.len()
    }

    pub fn get(&self, id: OptionId) -> Option<&ResponseOption> {
        self.options.get(id)
    }

    pub fn weight_of(&self, id: OptionId) -> Option<u8> {
        self.options.get(id).map(|o| o.weight)
    }

    /// Case-insensitive label lookup
    pub fn find(&self, label: &str) -> Option<OptionId> {
        let wanted = normalize_label(label);
        self.options
            .iter()
            .position(|o| normalize_label(&o.label) == wanted)
    }
}

/// Labels compare trimmed and case-folded
fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Fixed question sequence plus the scale every question is answered on
#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<Question>,
    pub scale: ResponseScale,
}

impl Quiz {
    pub fn new(
        title: impl Into<String>,
        prompts: Vec<String>,
        scale: ResponseScale,
    ) -> Result<Self> {
        if prompts.is_empty() {
            return Err(AdvisorError::startup("quiz has no questions"));
        }

        let questions = prompts
            .into_iter()
            .enumerate()
            .map(|(position, text)| Question { position, text })
            .collect();

        Ok(Self {
            title: title.into(),
            questions,
            scale,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

/// Count of answers per weight bucket, ordered by ascending weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<u32>);

impl FeatureVector {
    pub fn new(counts: Vec<u32>) -> Self {
        Self(counts)
    }

    pub fn counts(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Sum of all buckets; equals the number of answered questions
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Values in the shape classifiers consume
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&c| c as f64).collect()
    }
}

/// Probability assigned to one known class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f64,
}

/// Outcome of one prediction over a completed answer set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Decoded career label
    pub label: String,
    /// Class index as produced by the classifier
    pub class_index: usize,
    /// Feature vector the prediction was computed from
    pub features: FeatureVector,
    /// Per-class probabilities in label encoder order, when the model provides them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<ClassProbability>>,
}

/// How far a session has got through the quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(label: &str, weight: u8) -> ResponseOption {
        ResponseOption {
            label: label.to_string(),
            weight,
        }
    }

    #[test]
    fn test_scale_accepts_permuted_weights() {
        let scale = ResponseScale::new(vec![
            option("Strongly Agree", 3),
            option("Agree", 2),
            option("Neutral", 1),
            option("Disagree", 0),
        ])
        .unwrap();
        assert_eq!(scale.bucket_count(), 4);
        assert_eq!(scale.weight_of(0), Some(3));
        assert_eq!(scale.weight_of(3), Some(0));
        assert_eq!(scale.weight_of(4), None);
    }

    #[test]
    fn test_scale_rejects_duplicate_weight() {
        let err = ResponseScale::new(vec![option("Yes", 0), option("No", 0)]).unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidScale(_)));
    }

    #[test]
    fn test_scale_rejects_out_of_range_weight() {
        let err = ResponseScale::new(vec![option("Yes", 0), option("No", 2)]).unwrap_err();
        assert!(err.to_string().contains("outside 0..2"));
    }

    #[test]
    fn test_scale_rejects_duplicate_label_ignoring_case() {
        let err = ResponseScale::new(vec![option("Yes", 0), option(" yes", 1)]).unwrap_err();
        assert!(err.to_string().contains("duplicate option label"));
    }

    #[test]
    fn test_scale_rejects_single_option() {
        assert!(ResponseScale::new(vec![option("Only", 0)]).is_err());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let scale = ResponseScale::career_default();
        assert_eq!(scale.find("strongly no"), Some(3));
        assert_eq!(scale.find("  YES "), Some(1));
        assert_eq!(scale.find("maybe"), None);
    }

    #[test]
    fn test_padded_label_is_trimmed_and_findable() {
        let scale = ResponseScale::new(vec![option(" Yes ", 0), option("No", 1)]).unwrap();
        assert_eq!(scale.options()[0].label, "Yes");
        assert_eq!(scale.find("yes"), Some(0));
        assert_eq!(scale.find(" YES"), Some(0));
    }

    #[test]
    fn test_find_folds_non_ascii_case() {
        let scale = ResponseScale::new(vec![option("Très bien", 0), option("Égal", 1)]).unwrap();
        assert_eq!(scale.find("TRÈS BIEN"), Some(0));
        assert_eq!(scale.find("égal"), Some(1));
    }

    #[test]
    fn test_scale_rejects_non_ascii_duplicate_label() {
        let err = ResponseScale::new(vec![option("Égal", 0), option("égal", 1)]).unwrap_err();
        assert!(err.to_string().contains("duplicate option label"));
    }

    #[test]
    fn test_career_default_is_valid() {
        let scale = ResponseScale::career_default();
        assert_eq!(ResponseScale::new(scale.options().to_vec()).unwrap(), scale);
    }

    #[test]
    fn test_quiz_assigns_positions() {
        let quiz = Quiz::new(
            "t",
            vec!["a".to_string(), "b".to_string()],
            ResponseScale::career_default(),
        )
        .unwrap();
        assert_eq!(quiz.questions[1].position, 1);
        assert_eq!(quiz.questions[1].text, "b");
    }

    #[test]
    fn test_quiz_requires_questions() {
        assert!(Quiz::new("t", vec![], ResponseScale::career_default()).is_err());
    }

    #[test]
    fn test_feature_vector_total() {
        let features = FeatureVector::new(vec![1, 2, 0, 5]);
        assert_eq!(features.total(), 8);
        assert_eq!(features.to_f64(), vec![1.0, 2.0, 0.0, 5.0]);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { answered: 2, total: 8 }.fraction(), 0.25);
        assert_eq!(Progress { answered: 0, total: 0 }.fraction(), 0.0);
    }
}
