use bootcamp_core::model::{LessonId, LessonProgress, LevelId, QuizScore};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn level_id_from_text(raw: String) -> Result<LevelId, StorageError> {
    LevelId::new(raw).map_err(ser)
}

pub(crate) fn score_to_i64(score: Option<QuizScore>) -> Option<i64> {
    score.map(|s| i64::from(s.value()))
}

fn score_from_i64(v: i64) -> Result<QuizScore, StorageError> {
    let raw = u32::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("invalid quiz_score: {v}")))?;
    QuizScore::new(raw).map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let lesson_id =
        LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?).map_err(ser)?;
    let completed = row.try_get::<i64, _>("completed").map_err(ser)? != 0;
    let quiz_score = row
        .try_get::<Option<i64>, _>("quiz_score")
        .map_err(ser)?
        .map(score_from_i64)
        .transpose()?;
    let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;

    LessonProgress::from_persisted(lesson_id, completed, quiz_score, completed_at).map_err(ser)
}
