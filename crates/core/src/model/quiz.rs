use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ids::QuizId, question::Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz name cannot be empty")]
    EmptyName,
}

/// A named, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: Option<QuizId>,
    name: String,
    description: Option<String>,
    date: Option<DateTime<Utc>>,
    questions: Vec<Question>,
}

impl Quiz {
    /// Create an unsaved quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyName` if `name` is blank.
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Result<Self, QuizError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(QuizError::EmptyName);
        }
        Ok(Self {
            id: None,
            name,
            description: None,
            date: None,
            questions,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: QuizId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date = date;
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<QuizId> {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn questions_mut(&mut self) -> &mut [Question] {
        &mut self.questions
    }

    /// Hand the questions over, leaving the quiz empty.
    pub(crate) fn take_questions(&mut self) -> Vec<Question> {
        std::mem::take(&mut self.questions)
    }

    pub(crate) fn set_questions(&mut self, questions: Vec<Question>) {
        self.questions = questions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_requires_a_name() {
        assert_eq!(Quiz::new(" ", vec![]), Err(QuizError::EmptyName));
    }

    #[test]
    fn empty_description_is_none() {
        let quiz = Quiz::new("Capitals", vec![])
            .unwrap()
            .with_description(Some(String::new()));
        assert_eq!(quiz.description(), None);
    }
}
