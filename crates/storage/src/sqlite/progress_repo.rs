use async_trait::async_trait;
use bootcamp_core::model::{InstructorId, LessonProgress, LevelId, LevelProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{level_id_from_text, map_progress_row, score_to_i64, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_lesson_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        record: &LessonProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (instructor_id, level_id, lesson_id, completed, quiz_score, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(instructor_id, level_id, lesson_id) DO UPDATE SET
                completed = excluded.completed,
                quiz_score = excluded.quiz_score,
                completed_at = excluded.completed_at
            ",
        )
        .bind(instructor.as_str())
        .bind(level.as_str())
        .bind(record.lesson_id().as_str())
        .bind(i64::from(record.is_completed()))
        .bind(score_to_i64(record.quiz_score()))
        .bind(record.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn level_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Option<LevelProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id, completed, quiz_score, completed_at
            FROM lesson_progress
            WHERE instructor_id = ?1 AND level_id = ?2
            ORDER BY seq ASC
            ",
        )
        .bind(instructor.as_str())
        .bind(level.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(map_progress_row(row)?);
        }
        Ok(Some(LevelProgress::from_records(records)))
    }

    async fn instructor_progress(
        &self,
        instructor: &InstructorId,
    ) -> Result<Vec<(LevelId, LevelProgress)>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT level_id, lesson_id, completed, quiz_score, completed_at
            FROM lesson_progress
            WHERE instructor_id = ?1
            ORDER BY level_id ASC, seq ASC
            ",
        )
        .bind(instructor.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut levels: Vec<(LevelId, Vec<LessonProgress>)> = Vec::new();
        for row in &rows {
            let level = level_id_from_text(row.try_get::<String, _>("level_id").map_err(ser)?)?;
            let record = map_progress_row(row)?;
            match levels.last_mut() {
                Some((current, records)) if *current == level => records.push(record),
                _ => levels.push((level, vec![record])),
            }
        }

        Ok(levels
            .into_iter()
            .map(|(level, records)| (level, LevelProgress::from_records(records)))
            .collect())
    }
}
