use serde::{Deserialize, Serialize};

use crate::model::ids::AnswerId;

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    id: Option<AnswerId>,
    text: String,
    is_correct: bool,
}

impl Answer {
    #[must_use]
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: None,
            text: text.into(),
            is_correct,
        }
    }

    /// Rehydrate an answer that already has a store-assigned id.
    #[must_use]
    pub fn from_persisted(id: AnswerId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: Some(id),
            text: text.into(),
            is_correct,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<AnswerId> {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}
