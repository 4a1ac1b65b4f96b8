use async_trait::async_trait;
use quiz_core::model::{Answer, AnswerId, Question, QuestionId, Quiz, QuizId, UserProgress};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for quizzes, their questions and answers.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Store a new quiz; ids for the quiz, its questions and answers are assigned here.
    ///
    /// Progress already attached to questions is stored too.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn save_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError>;

    /// Fetch a quiz by name, with progress attached to its questions.
    ///
    /// When several quizzes share a name the earliest stored one wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no quiz has that name.
    async fn load_quiz(&self, name: &str) -> Result<Quiz, StorageError>;

    /// Names of all stored quizzes in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quiz_names(&self) -> Result<Vec<String>, StorageError>;

    /// Every stored quiz in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;

    /// Remove all quizzes together with their questions, answers and progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn erase_all_quizzes(&self) -> Result<(), StorageError>;
}

/// Repository contract for per-question learner progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Create the progress row for a question, or update level, streak and comment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn upsert_user_progress(
        &self,
        question_id: QuestionId,
        progress: &UserProgress,
    ) -> Result<(), StorageError>;

    /// Fetch progress for a question, `None` if it was never answered.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user_progress(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<UserProgress>, StorageError>;
}

/// Rebuild a question with store-assigned ids, keeping everything else.
pub(crate) fn question_with_ids(
    question: &Question,
    id: QuestionId,
    mut answer_id: impl FnMut() -> AnswerId,
) -> Result<Question, StorageError> {
    let answers = question
        .answers()
        .iter()
        .map(|a| Answer::from_persisted(answer_id(), a.text(), a.is_correct()))
        .collect();

    Ok(Question::new(question.text(), answers)
        .map_err(|e| StorageError::Serialization(e.to_string()))?
        .with_id(id)
        .with_image_path(question.image_path().map(str::to_owned))
        .with_comment(question.comment().map(str::to_owned)))
}

#[derive(Default)]
struct MemoryState {
    last_id: u64,
    quizzes: Vec<Quiz>,
    progress: HashMap<QuestionId, UserProgress>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn with_progress(&self, quiz: &Quiz) -> Quiz {
        let mut quiz = quiz.clone();
        for question in quiz.questions_mut() {
            let progress = question.id().and_then(|id| self.progress.get(&id).cloned());
            question.set_user_progress(progress);
        }
        quiz
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn save_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let mut guard = self.lock()?;
        let quiz_id = QuizId::new(guard.next_id());

        let mut questions = Vec::with_capacity(quiz.questions().len());
        for question in quiz.questions() {
            let question_id = QuestionId::new(guard.next_id());
            let stored = question_with_ids(question, question_id, || {
                AnswerId::new(guard.next_id())
            })?;
            if let Some(progress) = question.user_progress() {
                guard.progress.insert(question_id, progress.clone());
            }
            questions.push(stored);
        }

        let stored = Quiz::new(quiz.name(), questions)
            .map_err(|e| StorageError::Serialization(e.to_string()))?
            .with_id(quiz_id)
            .with_description(quiz.description().map(str::to_owned))
            .with_date(quiz.date());
        guard.quizzes.push(stored);
        Ok(quiz_id)
    }

    async fn load_quiz(&self, name: &str) -> Result<Quiz, StorageError> {
        let guard = self.lock()?;
        guard
            .quizzes
            .iter()
            .find(|quiz| quiz.name() == name)
            .map(|quiz| guard.with_progress(quiz))
            .ok_or(StorageError::NotFound)
    }

    async fn list_quiz_names(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.quizzes.iter().map(|q| q.name().to_owned()).collect())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.quizzes.iter().map(|q| guard.with_progress(q)).collect())
    }

    async fn erase_all_quizzes(&self) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.quizzes.clear();
        guard.progress.clear();
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_user_progress(
        &self,
        question_id: QuestionId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let known = guard
            .quizzes
            .iter()
            .flat_map(Quiz::questions)
            .any(|q| q.id() == Some(question_id));
        if !known {
            return Err(StorageError::NotFound);
        }
        guard.progress.insert(question_id, progress.clone());
        Ok(())
    }

    async fn get_user_progress(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&question_id).cloned())
    }
}

/// Aggregates quiz and progress repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { quizzes, progress }
    }
}
