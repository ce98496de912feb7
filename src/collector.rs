use crate::error::{AdvisorError, Result};
use crate::models::{OptionId, Progress, Question, Quiz};
use log::debug;
use std::sync::Arc;

/// Walks one user through the quiz, one answer per question.
///
/// The cursor always stays within `0..=question_count`; it equals
/// `question_count` once every question has been answered.
#[derive(Debug, Clone)]
pub struct AnswerCollector {
    quiz: Arc<Quiz>,
    answers: Vec<Option<OptionId>>,
    cursor: usize,
}

impl AnswerCollector {
    /// Create a collector with every answer unset
    pub fn new(quiz: Arc<Quiz>) -> Self {
        let answers = vec![None; quiz.len()];
        Self {
            quiz,
            answers,
            cursor: 0,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Question at the cursor, or `None` once the sequence is exhausted
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.cursor)
    }

    /// Answer previously recorded at `position`, if any
    pub fn answer_at(&self, position: usize) -> Option<OptionId> {
        self.answers.get(position).copied().flatten()
    }

    /// Record `option` for the current question and move to the next one
    pub fn record_answer(&mut self, option: OptionId) -> Result<()> {
        if self.is_complete() {
            return Err(AdvisorError::invalid_state(
                "cannot record an answer after the last question",
            ));
        }
        if self.quiz.scale.get(option).is_none() {
            return Err(AdvisorError::invalid_state(format!(
                "option {} is not part of the response scale",
                option
            )));
        }

        debug!("Recorded option {} for question {}", option, self.cursor + 1);
        self.answers[self.cursor] = Some(option);
        self.cursor += 1;
        Ok(())
    }

    /// Step back one question. Returns false when already at the first one.
    pub fn go_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.answers.len()
    }

    /// Clear every answer and return to the first question
    pub fn restart(&mut self) {
        self.answers.iter_mut().for_each(|a| *a = None);
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn answers(&self) -> &[Option<OptionId>] {
        &self.answers
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.answers.iter().filter(|a| a.is_some()).count(),
            total: self.answers.len(),
        }
    }
}
