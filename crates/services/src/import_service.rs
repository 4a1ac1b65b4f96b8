use std::path::Path;
use std::sync::Arc;

use quiz_core::model::QuizId;
use quiz_core::parse;
use storage::repository::QuizRepository;

use crate::Clock;
use crate::error::ImportError;

/// What an import stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedQuiz {
    pub id: QuizId,
    pub name: String,
    pub question_count: usize,
}

/// Turns quiz documents into stored quizzes.
#[derive(Clone)]
pub struct ImportService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

impl ImportService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Parse a document and store it, stamped with the current time.
    ///
    /// Documents carry no description; `description` is stored as given.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Parse` for malformed documents.
    /// Returns `ImportError::Storage` if persistence fails.
    pub async fn import_text(
        &self,
        text: &str,
        description: Option<String>,
    ) -> Result<ImportedQuiz, ImportError> {
        let quiz = parse(text)?
            .with_date(Some(self.clock.now()))
            .with_description(description);

        let id = self.quizzes.save_quiz(&quiz).await?;
        log::info!(
            "imported quiz {:?} ({} questions)",
            quiz.name(),
            quiz.questions().len()
        );

        Ok(ImportedQuiz {
            id,
            name: quiz.name().to_owned(),
            question_count: quiz.questions().len(),
        })
    }

    /// Read a document from disk and import it.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Read` if the file cannot be read, otherwise the
    /// same errors as [`ImportService::import_text`].
    pub async fn import_file(
        &self,
        path: &Path,
        description: Option<String>,
    ) -> Result<ImportedQuiz, ImportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("read {} bytes from {}", text.len(), path.display());
        self.import_text(&text, description).await
    }
}
