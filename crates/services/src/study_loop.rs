use std::sync::Arc;

use quiz_core::model::{AnswerCheck, NUMBER_OF_LEVELS, Question};
use quiz_core::scheduler::{Draw, OutcomeReport, QuestionHandle, ReviewScheduler, SchedulerError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{ProgressRepository, QuizRepository};

use crate::error::StudyError;

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyAnswerResult {
    pub check: AnswerCheck,
    pub report: OutcomeReport,
    /// False when the question has no stored id, so nothing was written.
    pub persisted: bool,
    pub is_complete: bool,
}

/// One learner working through one quiz.
pub struct StudySession {
    scheduler: ReviewScheduler,
    answered: u32,
    correct: u32,
}

impl StudySession {
    #[must_use]
    pub fn new(scheduler: ReviewScheduler) -> Self {
        Self {
            scheduler,
            answered: 0,
            correct: 0,
        }
    }

    /// Draw the next question; `None` once every question reached the top level.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Scheduler` if sampling fails.
    pub fn next(&mut self) -> Result<Option<QuestionHandle>, StudyError> {
        match self.scheduler.draw()? {
            Draw::Question(handle) => Ok(Some(handle)),
            Draw::Exhausted => Ok(None),
        }
    }

    #[must_use]
    pub fn question(&self, handle: QuestionHandle) -> Option<&Question> {
        self.scheduler.question(handle)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.scheduler
            .current()
            .and_then(|handle| self.scheduler.question(handle))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.scheduler.has_remaining_work()
    }

    #[must_use]
    pub fn levels_histogram(&self) -> [usize; NUMBER_OF_LEVELS] {
        self.scheduler.levels_histogram()
    }

    #[must_use]
    pub fn quiz_name(&self) -> &str {
        self.scheduler.quiz_name()
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    fn grade_current(
        &mut self,
        selected: &[usize],
    ) -> Result<(AnswerCheck, OutcomeReport), StudyError> {
        let handle = self
            .scheduler
            .current()
            .ok_or(SchedulerError::NoCurrentQuestion)?;
        let check = self
            .scheduler
            .question(handle)
            .ok_or(SchedulerError::UnknownQuestion(handle))?
            .check_indices(selected)?;

        let report = self.scheduler.record_outcome(handle, check.is_correct)?;
        self.answered += 1;
        if check.is_correct {
            self.correct += 1;
        }
        Ok((check, report))
    }
}

/// Loads quizzes into sessions and persists progress as answers come in.
#[derive(Clone)]
pub struct StudyLoopService {
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { quizzes, progress }
    }

    /// Start a session on the named quiz, with stored progress applied.
    ///
    /// A `seed` makes the question order reproducible.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` if the quiz cannot be loaded.
    /// Returns `StudyError::EmptyQuiz` if it has no questions.
    pub async fn start(&self, name: &str, seed: Option<u64>) -> Result<StudySession, StudyError> {
        let quiz = self.quizzes.load_quiz(name).await?;
        if quiz.questions().is_empty() {
            return Err(StudyError::EmptyQuiz(name.to_owned()));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let scheduler = ReviewScheduler::with_rng(quiz, rng);
        log::debug!(
            "study session on {name:?} starts with levels {:?}",
            scheduler.levels_histogram()
        );
        Ok(StudySession::new(scheduler))
    }

    /// Grade the selected answer indices for the current question, update
    /// its level and store the new progress.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Scheduler` if no question was drawn.
    /// Returns `StudyError::AnswerCheck` for an out-of-range answer index; the
    /// question stays current so the learner can answer again.
    /// Returns `StudyError::Storage` if persistence fails.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        selected: &[usize],
    ) -> Result<StudyAnswerResult, StudyError> {
        let (check, report) = session.grade_current(selected)?;

        let persisted = match report.question_id {
            Some(id) => {
                self.progress
                    .upsert_user_progress(id, &report.progress)
                    .await?;
                true
            }
            None => {
                log::warn!("question {:?} has no id, progress not stored", report.handle);
                false
            }
        };

        Ok(StudyAnswerResult {
            check,
            report,
            persisted,
            is_complete: session.is_complete(),
        })
    }

    /// Level histogram of a stored quiz.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` if the quiz cannot be loaded.
    pub async fn levels_histogram(
        &self,
        name: &str,
    ) -> Result<[usize; NUMBER_OF_LEVELS], StudyError> {
        let quiz = self.quizzes.load_quiz(name).await?;
        Ok(ReviewScheduler::from_quiz(quiz).levels_histogram())
    }
}
