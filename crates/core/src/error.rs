use thiserror::Error;

use crate::model::{AnswerCheckError, ProgressError, QuestionError, QuizError};
use crate::parser::ParseError;
use crate::scheduler::SchedulerError;

/// Any error produced by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    AnswerCheck(#[from] AnswerCheckError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
