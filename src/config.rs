use crate::error::Result;
use crate::models::{Quiz, ResponseOption, ResponseScale};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A response option as written in the config file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptionConfig {
    /// Label shown to the user
    pub label: String,
    /// Weight bucket the option counts toward
    pub weight: u8,
}

/// Quiz configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuizConfig {
    /// Title shown above the first question
    #[serde(default = "default_title")]
    pub title: String,
    /// Path to the classifier bundle (JSON)
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Questions in the order they are asked
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
    /// Response options shared by every question
    #[serde(default = "default_options")]
    pub options: Vec<OptionConfig>,
    /// Show the per-class probability breakdown when the model provides one
    #[serde(default = "default_show_probabilities")]
    pub show_probabilities: bool,
}

fn default_title() -> String {
    "Smart Career Advisor".to_string()
}

fn default_questions() -> Vec<String> {
    [
        "Do you enjoy building applications?",
        "Do you like analyzing data?",
        "Are you interested in cyber security?",
        "Do you enjoy designing user interfaces?",
        "Do you like solving programming problems?",
        "Do you enjoy statistics and math?",
        "Are you interested in ethical hacking?",
        "Do you like creativity and visual design?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

fn default_options() -> Vec<OptionConfig> {
    ResponseScale::career_default()
        .options()
        .iter()
        .map(|o| OptionConfig {
            label: o.label.clone(),
            weight: o.weight,
        })
        .collect()
}

fn default_show_probabilities() -> bool {
    true
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            model_path: None,
            questions: default_questions(),
            options: default_options(),
            show_probabilities: default_show_probabilities(),
        }
    }
}

impl QuizConfig {
    /// Load configuration from a TOML file.
    ///
    /// A relative `model_path` is taken relative to the config file's directory.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_model_path(base);
        }
        Ok(config)
    }

    fn resolve_model_path(&mut self, base: &Path) {
        if let Some(model_path) = &self.model_path {
            if model_path.is_relative() {
                self.model_path = Some(base.join(model_path));
            }
        }
    }

    /// Validate the options and questions and build the quiz
    pub fn build_quiz(&self) -> Result<Quiz> {
        let options = self
            .options
            .iter()
            .map(|o| ResponseOption {
                label: o.label.clone(),
                weight: o.weight,
            })
            .collect();
        let scale = ResponseScale::new(options)?;

        Quiz::new(self.title.clone(), self.questions.clone(), scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
title = "Study Planner"
model_path = "/tmp/model.json"
show_probabilities = false
questions = ["Do you like labs?", "Do you like essays?"]

[[options]]
label = "Strongly Agree"
weight = 3

[[options]]
label = "Agree"
weight = 2

[[options]]
label = "Neutral"
weight = 1

[[options]]
label = "Disagree"
weight = 0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = QuizConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.title, "Study Planner");
        assert_eq!(config.model_path, Some(PathBuf::from("/tmp/model.json")));
        assert!(!config.show_probabilities);
        assert_eq!(config.questions.len(), 2);
        assert_eq!(config.options.len(), 4);
        assert_eq!(config.options[0].weight, 3);

        let quiz = config.build_quiz().unwrap();
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz.scale.find("neutral"), Some(2));
    }

    #[test]
    fn test_relative_model_path_follows_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("quiz.toml");
        std::fs::write(&config_path, "model_path = \"data/career_model.json\"\n").unwrap();

        let config = QuizConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.model_path,
            Some(dir.path().join("data/career_model.json"))
        );
    }

    #[test]
    fn test_absolute_model_path_is_kept() {
        let mut config = QuizConfig {
            model_path: Some(PathBuf::from("/srv/models/career.json")),
            ..QuizConfig::default()
        };
        config.resolve_model_path(Path::new("/etc/advisor"));
        assert_eq!(config.model_path, Some(PathBuf::from("/srv/models/career.json")));
    }

    #[test]
    fn test_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "").unwrap();

        let config = QuizConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.title, "Smart Career Advisor");
        assert!(config.model_path.is_none());
        assert!(config.show_probabilities);
        assert_eq!(config.questions.len(), 8);
        assert_eq!(config.options.len(), 4);

        let quiz = config.build_quiz().unwrap();
        assert_eq!(quiz.scale, ResponseScale::career_default());
    }

    #[test]
    fn test_config_invalid_scale() {
        let config = QuizConfig {
            options: vec![
                OptionConfig {
                    label: "Yes".to_string(),
                    weight: 1,
                },
                OptionConfig {
                    label: "No".to_string(),
                    weight: 1,
                },
            ],
            ..QuizConfig::default()
        };

        assert!(matches!(
            config.build_quiz(),
            Err(AdvisorError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_config_missing_file() {
        let result = QuizConfig::from_file(Path::new("/nonexistent/quiz.toml"));
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_malformed_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "questions = [unterminated").unwrap();

        let result = QuizConfig::from_file(temp_file.path());
        assert!(result.unwrap_err().to_string().contains("Failed to parse TOML config"));
    }
}
