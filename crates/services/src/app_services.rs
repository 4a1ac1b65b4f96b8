use std::sync::Arc;

use storage::repository::{QuizRepository, Storage};

use crate::Clock;
use crate::error::AppServicesError;
use crate::import_service::ImportService;
use crate::study_loop::StudyLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quizzes: Arc<dyn QuizRepository>,
    import: Arc<ImportService>,
    study_loop: Arc<StudyLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let import = Arc::new(ImportService::new(clock, Arc::clone(&storage.quizzes)));
        let study_loop = Arc::new(StudyLoopService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
        ));
        Self {
            quizzes: Arc::clone(&storage.quizzes),
            import,
            study_loop,
        }
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<dyn QuizRepository> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn import(&self) -> Arc<ImportService> {
        Arc::clone(&self.import)
    }

    #[must_use]
    pub fn study_loop(&self) -> Arc<StudyLoopService> {
        Arc::clone(&self.study_loop)
    }
}
