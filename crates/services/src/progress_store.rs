use std::collections::HashMap;
use std::sync::Arc;

use bootcamp_core::model::{
    InstructorId, LessonId, LessonProgress, LevelId, LevelProgress, ProgressStats, QuizScore,
};
use storage::catalog::LessonCatalog;
use storage::repository::{ProgressRepository, Storage};
use tracing::debug;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Durable progress keyed by (instructor, level), plus curriculum-wide queries.
///
/// Curriculum totals come from the catalog, so a record for a lesson that is no
/// longer in the catalog does not count towards completion.
#[derive(Clone)]
pub struct ProgressStore {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    catalog: Arc<dyn LessonCatalog>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        catalog: Arc<dyn LessonCatalog>,
    ) -> Self {
        Self {
            clock,
            progress,
            catalog,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.catalog),
        )
    }

    /// Upsert the record for `lesson_id`, stamped with the current time.
    ///
    /// Returns the record as persisted.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    pub async fn save(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        lesson_id: &LessonId,
        completed: bool,
        score: QuizScore,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let record =
            LessonProgress::from_persisted(lesson_id.clone(), completed, Some(score), self.clock.now())?;
        self.progress
            .upsert_lesson_progress(instructor, level, &record)
            .await?;
        debug!(%instructor, %level, lesson = %lesson_id, completed, score = score.value(), "saved lesson progress");
        Ok(record)
    }

    /// Saved progress for a level, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails.
    pub async fn load(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Option<LevelProgress>, ProgressServiceError> {
        Ok(self.progress.level_progress(instructor, level).await?)
    }

    /// Completion across every level of the instructor's curriculum.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or progress cannot be read.
    pub async fn stats(&self, instructor: &InstructorId) -> Result<ProgressStats, ProgressServiceError> {
        let levels = self.catalog.levels(instructor).await?;
        let saved: HashMap<LevelId, LevelProgress> = self
            .progress
            .instructor_progress(instructor)
            .await?
            .into_iter()
            .collect();

        let mut total = 0_usize;
        let mut completed = 0_usize;
        for level in &levels {
            let lessons = self.catalog.lessons(instructor, level).await?;
            total += lessons.len();
            if let Some(progress) = saved.get(level) {
                completed += lessons
                    .iter()
                    .filter(|lesson| progress.is_lesson_completed(lesson.id()))
                    .count();
            }
        }

        Ok(ProgressStats::compute(completed, total))
    }

    /// True iff the curriculum has lessons and every one of them is completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or progress cannot be read.
    pub async fn is_completed(&self, instructor: &InstructorId) -> Result<bool, ProgressServiceError> {
        Ok(self.stats(instructor).await?.is_complete())
    }
}
