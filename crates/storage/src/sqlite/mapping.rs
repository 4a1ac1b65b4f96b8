use quiz_core::model::{Answer, AnswerId, Level, QuestionId, QuizId, UserProgress};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

/// Map an `answers` row (`id`, `text`, `is_correct`).
pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer::from_persisted(
        answer_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    ))
}

/// Map the progress columns of a `questions LEFT JOIN question_progress` row.
///
/// A null `level` means the question was never answered.
pub(crate) fn map_progress_columns(row: &SqliteRow) -> Result<Option<UserProgress>, StorageError> {
    let Some(level) = row.try_get::<Option<i64>, _>("level").map_err(ser)? else {
        return Ok(None);
    };
    let level = u32::try_from(level)
        .map_err(|_| StorageError::Serialization(format!("invalid level: {level}")))
        .and_then(|l| Level::new(l).map_err(ser))?;
    let streak = row.try_get::<i64, _>("correct_streak").map_err(ser)?;
    let streak = u32::try_from(streak)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_streak: {streak}")))?;

    Ok(Some(UserProgress {
        level,
        correct_streak: streak,
        comment: row.try_get::<Option<String>, _>("progress_comment").map_err(ser)?,
    }))
}
