mod answer;
mod ids;
mod progress;
mod question;
mod quiz;

pub use ids::{AnswerId, ParseIdError, QuestionId, QuizId};

pub use answer::Answer;
pub use progress::{Level, NEEDED_CORRECT_ANSWERS, NUMBER_OF_LEVELS, ProgressError, UserProgress};
pub use question::{AnswerCheck, AnswerCheckError, Question, QuestionError};
pub use quiz::{Quiz, QuizError};
