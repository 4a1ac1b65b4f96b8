use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{answer::Answer, ids::QuestionId, progress::UserProgress};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerCheckError {
    #[error("selection has {provided} entries but the question has {expected} answers")]
    SelectionLengthMismatch { expected: usize, provided: usize },

    #[error("answer number {index} does not exist (question has {len} answers)")]
    IndexOutOfRange { index: usize, len: usize },
}

//
// ─── ANSWER CHECK ──────────────────────────────────────────────────────────────
//

/// Result of comparing a learner's selection with the answer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheck {
    pub is_correct: bool,
    /// Indices of answers whose selection differs from the key.
    pub mismatched: Vec<usize>,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multi-select question.
///
/// Any number of answers may be correct; a selection is right only when
/// it matches the key exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: Option<QuestionId>,
    text: String,
    answers: Vec<Answer>,
    image_path: Option<String>,
    comment: Option<String>,
    user_progress: Option<UserProgress>,
}

impl Question {
    /// Create an unsaved question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn new(text: impl Into<String>, answers: Vec<Answer>) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        Ok(Self {
            id: None,
            text,
            answers,
            image_path: None,
            comment: None,
            user_progress: None,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_image_path(mut self, image_path: Option<String>) -> Self {
        self.image_path = image_path;
        self
    }

    /// Attach the authored comment; an empty comment is stored as `None`.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<UserProgress>) -> Self {
        self.user_progress = progress;
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<QuestionId> {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub fn user_progress(&self) -> Option<&UserProgress> {
        self.user_progress.as_ref()
    }

    pub fn set_user_progress(&mut self, progress: Option<UserProgress>) {
        self.user_progress = progress;
    }

    /// Progress for this question, created at level 0 if it was absent.
    pub fn ensure_progress(&mut self) -> &mut UserProgress {
        self.user_progress.get_or_insert_with(UserProgress::default)
    }

    /// Grade a selection given as one flag per answer.
    ///
    /// # Errors
    ///
    /// Returns `AnswerCheckError::SelectionLengthMismatch` if `selected`
    /// does not have one entry per answer.
    pub fn check_selection(&self, selected: &[bool]) -> Result<AnswerCheck, AnswerCheckError> {
        if selected.len() != self.answers.len() {
            return Err(AnswerCheckError::SelectionLengthMismatch {
                expected: self.answers.len(),
                provided: selected.len(),
            });
        }

        let mismatched: Vec<usize> = self
            .answers
            .iter()
            .zip(selected)
            .enumerate()
            .filter(|(_, (answer, chosen))| answer.is_correct() != **chosen)
            .map(|(index, _)| index)
            .collect();

        Ok(AnswerCheck {
            is_correct: mismatched.is_empty(),
            mismatched,
        })
    }

    /// Grade a selection given as zero-based answer indices.
    ///
    /// # Errors
    ///
    /// Returns `AnswerCheckError::IndexOutOfRange` for an index past the last answer.
    pub fn check_indices(&self, chosen: &[usize]) -> Result<AnswerCheck, AnswerCheckError> {
        let mut selected = vec![false; self.answers.len()];
        for &index in chosen {
            let slot = selected
                .get_mut(index)
                .ok_or(AnswerCheckError::IndexOutOfRange {
                    index,
                    len: self.answers.len(),
                })?;
            *slot = true;
        }
        self.check_selection(&selected)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
