use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quiz_core::model::{Answer, Question, Quiz, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, map_answer_row, map_progress_columns, question_id_from_i64, quiz_id_from_i64, ser,
    usize_to_i64,
};
use super::progress_repo::UPSERT_PROGRESS_SQL;
use crate::repository::{QuizRepository, StorageError};

impl SqliteRepository {
    /// Load a full quiz (questions, answers, progress) by its row id.
    async fn load_quiz_by_id(&self, id: i64) -> Result<Quiz, StorageError> {
        let quiz_row = sqlx::query("SELECT id, name, description, date FROM quizzes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let answer_rows = sqlx::query(
            r"
            SELECT a.id, a.question_id, a.text, a.is_correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.quiz_id = ?1
            ORDER BY a.question_id, a.position
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answers: HashMap<i64, Vec<Answer>> = HashMap::new();
        for row in &answer_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            answers
                .entry(question_id)
                .or_default()
                .push(map_answer_row(row)?);
        }

        let question_rows = sqlx::query(
            r"
            SELECT
                q.id, q.text, q.image_path, q.comment,
                p.level, p.correct_streak, p.comment AS progress_comment
            FROM questions q
            LEFT JOIN question_progress p ON p.question_id = q.id
            WHERE q.quiz_id = ?1
            ORDER BY q.position
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let question_id: i64 = row.try_get("id").map_err(ser)?;
            let question = Question::new(
                row.try_get::<String, _>("text").map_err(ser)?,
                answers.remove(&question_id).unwrap_or_default(),
            )
            .map_err(ser)?
            .with_id(question_id_from_i64(question_id)?)
            .with_image_path(row.try_get("image_path").map_err(ser)?)
            .with_comment(row.try_get("comment").map_err(ser)?)
            .with_progress(map_progress_columns(row)?);
            questions.push(question);
        }

        let quiz = Quiz::new(
            quiz_row.try_get::<String, _>("name").map_err(ser)?,
            questions,
        )
        .map_err(ser)?
        .with_id(quiz_id_from_i64(quiz_row.try_get("id").map_err(ser)?)?)
        .with_description(quiz_row.try_get("description").map_err(ser)?)
        .with_date(
            quiz_row
                .try_get::<Option<DateTime<Utc>>, _>("date")
                .map_err(ser)?,
        );
        Ok(quiz)
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn save_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let quiz_row_id = sqlx::query(
            r"
            INSERT INTO quizzes (name, description, date)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(quiz.name())
        .bind(quiz.description())
        .bind(quiz.date())
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .last_insert_rowid();

        for (position, question) in quiz.questions().iter().enumerate() {
            let question_row_id = sqlx::query(
                r"
                INSERT INTO questions (quiz_id, position, text, image_path, comment)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(quiz_row_id)
            .bind(usize_to_i64("position", position)?)
            .bind(question.text())
            .bind(question.image_path())
            .bind(question.comment())
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .last_insert_rowid();

            for (answer_position, answer) in question.answers().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO answers (question_id, position, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(question_row_id)
                .bind(usize_to_i64("position", answer_position)?)
                .bind(answer.text())
                .bind(i64::from(answer.is_correct()))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }

            if let Some(progress) = question.user_progress() {
                sqlx::query(UPSERT_PROGRESS_SQL)
                    .bind(question_row_id)
                    .bind(i64::from(progress.level.value()))
                    .bind(i64::from(progress.correct_streak))
                    .bind(progress.comment.as_deref())
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        log::info!(
            "stored quiz {:?} with {} questions as id {quiz_row_id}",
            quiz.name(),
            quiz.questions().len()
        );

        quiz_id_from_i64(quiz_row_id)
    }

    async fn load_quiz(&self, name: &str) -> Result<Quiz, StorageError> {
        let row = sqlx::query("SELECT id FROM quizzes WHERE name = ?1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        self.load_quiz_by_id(row.try_get("id").map_err(ser)?).await
    }

    async fn list_quiz_names(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT name FROM quizzes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(ser))
            .collect()
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query("SELECT id FROM quizzes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in rows {
            quizzes.push(self.load_quiz_by_id(row.try_get("id").map_err(ser)?).await?);
        }
        Ok(quizzes)
    }

    async fn erase_all_quizzes(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for table in ["question_progress", "answers", "questions", "quizzes"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        log::info!("erased all quizzes");
        Ok(())
    }
}
