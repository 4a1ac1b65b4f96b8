use quiz_core::model::{QuestionId, UserProgress};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_columns, u64_to_i64};
use crate::repository::{ProgressRepository, StorageError};

pub(crate) const UPSERT_PROGRESS_SQL: &str = r"
    INSERT INTO question_progress (question_id, level, correct_streak, comment)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(question_id) DO UPDATE SET
        level = excluded.level,
        correct_streak = excluded.correct_streak,
        comment = excluded.comment
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_user_progress(
        &self,
        question_id: QuestionId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let id = u64_to_i64("question_id", question_id.value())?;

        let exists = sqlx::query("SELECT 1 FROM questions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .is_some();
        if !exists {
            return Err(StorageError::NotFound);
        }

        sqlx::query(UPSERT_PROGRESS_SQL)
            .bind(id)
            .bind(i64::from(progress.level.value()))
            .bind(i64::from(progress.correct_streak))
            .bind(progress.comment.as_deref())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        log::debug!(
            "progress for {question_id}: level {} streak {}",
            progress.level,
            progress.correct_streak
        );
        Ok(())
    }

    async fn get_user_progress(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT level, correct_streak, comment AS progress_comment
            FROM question_progress
            WHERE question_id = ?1
            ",
        )
        .bind(u64_to_i64("question_id", question_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_progress_columns(&row),
            None => Ok(None),
        }
    }
}
