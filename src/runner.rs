use crate::error::AdvisorError;
use crate::models::{OptionId, PredictionResult, ResponseScale};
use crate::output::{self, OutputFormat, ResultReport};
use crate::session::SessionStore;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// What the user typed at a question prompt
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Answer(OptionId),
    Back,
    Quit,
}

/// Drives quiz sessions against the shared store and renders their results
pub struct Runner {
    store: Arc<SessionStore>,
    format: OutputFormat,
    show_probabilities: bool,
}

impl Runner {
    /// Create a new runner over the given session store
    pub fn new(store: Arc<SessionStore>, format: OutputFormat, show_probabilities: bool) -> Self {
        Self {
            store,
            format,
            show_probabilities,
        }
    }

    /// Answer every question from a comma-separated list and predict
    pub fn run_scripted(&self, answers: &str) -> Result<PredictionResult> {
        let id = self.store.create();
        debug!("Scripted session {} started, {} active", id, self.store.len());
        let result = self.answer_all(id, answers);
        self.store.remove(id);
        result
    }

    fn answer_all(&self, id: Uuid, answers: &str) -> Result<PredictionResult> {
        let scale = &self.store.quiz().scale;
        let choices = answers
            .split(',')
            .map(|token| {
                parse_choice(scale, token)
                    .with_context(|| format!("Unknown answer '{}'", token.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        let expected = self.store.quiz().len();
        if choices.len() != expected {
            anyhow::bail!("Expected {} answers, got {}", expected, choices.len());
        }

        for choice in choices {
            self.store
                .with_session(id, |collector| collector.record_answer(choice))??;
        }

        let collector = self.store.with_session(id, |collector| collector.clone())?;
        self.store
            .pipeline()
            .evaluate(&collector)
            .context("Failed to predict a career")
    }

    /// Run the quiz interactively until the user quits or declines a restart.
    ///
    /// Returns one result per completed pass through the quiz.
    pub async fn run_interactive<R, W>(
        &self,
        reader: R,
        mut writer: W,
    ) -> Result<Vec<PredictionResult>>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let id = self.store.create();
        debug!("Interactive session {} started, {} active", id, self.store.len());
        let mut results = Vec::new();
        let title = self.store.quiz().title.clone();

        let banner = format!("🚀 {}\nAnswer the questions one by one\n", title);
        write_text(&mut writer, &banner).await?;

        loop {
            if !self.ask_questions(id, &mut lines, &mut writer).await? {
                info!("Session {} aborted", id);
                break;
            }

            match self.evaluate_session(id) {
                Ok(result) => {
                    let scale = &self.store.quiz().scale;
                    let report = ResultReport::new(&result, scale, self.show_probabilities);
                    let rendered = output::render_result(&report, self.format);
                    write_text(&mut writer, &format!("\n{}", rendered)).await?;
                    results.push(result);
                }
                Err(e) => {
                    warn!("Prediction failed for session {}: {:#}", id, e);
                    write_text(
                        &mut writer,
                        "\nSomething went wrong while predicting. Restart to try again.\n",
                    )
                    .await?;
                }
            }

            write_text(
                &mut writer,
                "\nType 'r' to restart the quiz, anything else to exit: ",
            )
            .await?;
            let restart = matches!(
                next_line(&mut lines).await?.as_deref().map(str::trim),
                Some("r") | Some("restart")
            );
            if !restart {
                break;
            }
            self.store.with_session(id, |collector| collector.restart())?;
            debug!("Session {} restarted", id);
        }

        self.store.remove(id);
        Ok(results)
    }

    /// Prompt until every question has an answer. Returns false on quit or end of input.
    async fn ask_questions<R, W>(
        &self,
        id: Uuid,
        lines: &mut tokio::io::Lines<R>,
        writer: &mut W,
    ) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let scale = &self.store.quiz().scale;

        loop {
            let prompt = self.store.with_session(id, |collector| {
                collector.current_question().map(|question| {
                    let mut text = format!(
                        "\n{}\nQuestion {}: {}\n",
                        output::progress_line(collector.progress()),
                        question.position + 1,
                        question.text
                    );
                    let previous = collector.answer_at(question.position);
                    for (i, option) in scale.options().iter().enumerate() {
                        let marker = if previous == Some(i) { "*" } else { " " };
                        text.push_str(&format!("{} {}. {}\n", marker, i + 1, option.label));
                    }
                    text.push_str("Your answer (number or label, 'b' to go back, 'q' to quit): ");
                    text
                })
            })?;

            let Some(prompt) = prompt else {
                return Ok(true);
            };
            write_text(writer, &prompt).await?;

            let Some(line) = next_line(lines).await? else {
                return Ok(false);
            };

            match parse_command(scale, &line) {
                Some(Command::Answer(option)) => {
                    self.store
                        .with_session(id, |collector| collector.record_answer(option))??;
                }
                Some(Command::Back) => {
                    let (moved, cursor) = self
                        .store
                        .with_session(id, |collector| (collector.go_back(), collector.cursor()))?;
                    if moved {
                        debug!("Session {} back to question {}", id, cursor + 1);
                    } else {
                        write_text(writer, "Already at the first question.\n").await?;
                    }
                }
                Some(Command::Quit) => return Ok(false),
                None => {
                    let message = format!("'{}' is not one of the options.\n", line.trim());
                    write_text(writer, &message).await?;
                }
            }
        }
    }

    fn evaluate_session(&self, id: Uuid) -> Result<PredictionResult, AdvisorError> {
        let collector = self.store.with_session(id, |collector| collector.clone())?;
        self.store.pipeline().evaluate(&collector)
    }
}

/// Parse a 1-based option number or an option label
fn parse_choice(scale: &ResponseScale, input: &str) -> Option<OptionId> {
    let input = input.trim();
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= scale.len() => Some(n - 1),
        Ok(_) => None,
        Err(_) => scale.find(input),
    }
}

fn parse_command(scale: &ResponseScale, input: &str) -> Option<Command> {
    match input.trim().to_lowercase().as_str() {
        "b" | "back" => Some(Command::Back),
        "q" | "quit" => Some(Command::Quit),
        _ => parse_choice(scale, input).map(Command::Answer),
    }
}

async fn next_line<R>(lines: &mut tokio::io::Lines<R>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    lines.next_line().await.context("Failed to read input")
}

async fn write_text<W>(writer: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    writer.flush().await.context("Failed to flush output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ModelBundle;
    use crate::classifier::tests::logistic_bundle_json;
    use crate::models::Quiz;
    use crate::pipeline::Pipeline;

    fn create_test_runner(questions: usize, format: OutputFormat) -> Runner {
        let prompts = (1..=questions).map(|i| format!("Question text {}", i)).collect();
        let quiz = Quiz::new("Test Advisor", prompts, ResponseScale::career_default()).unwrap();
        let pipeline = Pipeline::new(ModelBundle::from_json(logistic_bundle_json()).unwrap());
        let store = Arc::new(SessionStore::new(Arc::new(quiz), pipeline));
        Runner::new(store, format, true)
    }

    #[test]
    fn test_parse_choice() {
        let scale = ResponseScale::career_default();
        assert_eq!(parse_choice(&scale, "1"), Some(0));
        assert_eq!(parse_choice(&scale, " 4 "), Some(3));
        assert_eq!(parse_choice(&scale, "0"), None);
        assert_eq!(parse_choice(&scale, "5"), None);
        assert_eq!(parse_choice(&scale, "strongly yes"), Some(0));
        assert_eq!(parse_choice(&scale, "perhaps"), None);
    }

    #[test]
    fn test_parse_command() {
        let scale = ResponseScale::career_default();
        assert_eq!(parse_command(&scale, "B"), Some(Command::Back));
        assert_eq!(parse_command(&scale, "quit"), Some(Command::Quit));
        assert_eq!(parse_command(&scale, "No"), Some(Command::Answer(2)));
        assert_eq!(parse_command(&scale, ""), None);
    }

    #[test]
    fn test_run_scripted() {
        let runner = create_test_runner(4, OutputFormat::Plain);
        let result = runner.run_scripted("1, strongly yes,1,Yes").unwrap();

        assert_eq!(result.features.counts(), &[3, 1, 0, 0]);
        assert_eq!(result.label, "Software Developer");
        assert_eq!(runner.store.len(), 0);
    }

    #[test]
    fn test_run_scripted_wrong_count() {
        let runner = create_test_runner(4, OutputFormat::Plain);
        let err = runner.run_scripted("1,2").unwrap_err();
        assert!(err.to_string().contains("Expected 4 answers, got 2"));
        assert_eq!(runner.store.len(), 0);
    }

    #[test]
    fn test_run_scripted_unknown_answer() {
        let runner = create_test_runner(2, OutputFormat::Plain);
        let err = runner.run_scripted("1,maybe").unwrap_err();
        assert!(err.to_string().contains("Unknown answer 'maybe'"));
    }

    #[tokio::test]
    async fn test_run_interactive_single_pass() {
        let runner = create_test_runner(3, OutputFormat::Plain);
        let input: &[u8] = b"1\n1\n1\n\n";
        let mut output = Vec::new();

        let results = runner.run_interactive(input, &mut output).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].features.counts(), &[3, 0, 0, 0]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Test Advisor"));
        assert!(text.contains("Question 3: Question text 3"));
        assert!(text.contains("Recommended Career: Software Developer"));
        assert_eq!(runner.store.len(), 0);
    }

    #[tokio::test]
    async fn test_run_interactive_back_and_invalid_input() {
        let runner = create_test_runner(2, OutputFormat::Plain);
        // back at the first question, a bad answer, then change answer 1 after going back
        let input: &[u8] = b"b\nperhaps\n1\nb\n4\n4\nexit\n";
        let mut output = Vec::new();

        let results = runner.run_interactive(input, &mut output).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].features.counts(), &[0, 0, 0, 2]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Already at the first question."));
        assert!(text.contains("'perhaps' is not one of the options."));
        // the earlier answer is marked when revisiting
        assert!(text.contains("* 1. Strongly Yes"));
    }

    #[tokio::test]
    async fn test_run_interactive_restart() {
        let runner = create_test_runner(2, OutputFormat::Json);
        let input: &[u8] = b"1\n1\nr\n4\n4\n\n";
        let mut output = Vec::new();

        let results = runner.run_interactive(input, &mut output).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].features.counts(), &[2, 0, 0, 0]);
        assert_eq!(results[1].features.counts(), &[0, 0, 0, 2]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"career\""));
    }

    #[tokio::test]
    async fn test_run_interactive_quit() {
        let runner = create_test_runner(3, OutputFormat::Plain);
        let input: &[u8] = b"1\nq\n";
        let mut output = Vec::new();

        let results = runner.run_interactive(input, &mut output).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(runner.store.len(), 0);
    }

    #[tokio::test]
    async fn test_run_interactive_end_of_input() {
        let runner = create_test_runner(3, OutputFormat::Plain);
        let input: &[u8] = b"2\n";
        let mut output = Vec::new();

        let results = runner.run_interactive(input, &mut output).await.unwrap();
        assert!(results.is_empty());
    }
}
