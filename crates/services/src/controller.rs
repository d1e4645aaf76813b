use std::sync::Arc;
use std::time::Duration;

use bootcamp_core::model::{
    InstructorId, Lesson, LessonId, LessonProgress, LevelId, LevelProgress, ProgressStats,
    QuizScore, UpsertOutcome,
};
use storage::catalog::LessonCatalog;
use tracing::{debug, info, warn};

use crate::error::ProgressServiceError;
use crate::progress_store::ProgressStore;

/// Pause before auto-advancing, leaving room for the completion animation.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub advance_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            advance_delay: DEFAULT_ADVANCE_DELAY,
        }
    }
}

/// A lesson address: `/instructor/{instructor}/{level}/{lesson}` on the host side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonTarget {
    pub instructor: InstructorId,
    pub level: LevelId,
    pub lesson: LessonId,
}

/// What the host should do after a quiz is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Move to the next lesson of the level once `after` has elapsed.
    NavigateToLesson { target: LessonTarget, after: Duration },
    /// The whole curriculum is complete; show the final code screen.
    UnlockFinalCode(InstructorId),
    /// Last lesson of the level done, curriculum not finished. No transition.
    None,
}

/// Result of looking a lesson up in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonLookup {
    Found { lesson: Lesson, lessons: Vec<Lesson> },
    NotFound,
}

/// Result of opening a lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad {
    Ready(LessonSession),
    NotFound,
}

/// Outcome of `ProgressController::complete_quiz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCompletion {
    pub progress: Vec<LessonProgress>,
    pub outcome: UpsertOutcome,
    pub next_action: NextAction,
}

/// In-memory state for the lesson currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSession {
    instructor: InstructorId,
    level: LevelId,
    lesson: Lesson,
    lessons: Vec<Lesson>,
    progress: LevelProgress,
    curriculum_complete: bool,
}

impl LessonSession {
    #[must_use]
    pub fn instructor(&self) -> &InstructorId {
        &self.instructor
    }

    #[must_use]
    pub fn level(&self) -> &LevelId {
        &self.level
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    /// All lessons of the level in catalog order.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn progress(&self) -> &LevelProgress {
        &self.progress
    }

    /// Whether the instructor's whole curriculum was complete when last checked.
    #[must_use]
    pub fn curriculum_complete(&self) -> bool {
        self.curriculum_complete
    }

    /// Level completion figures for the progress tracker.
    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        ProgressController::compute_stats(self.progress.completed_count(), self.lessons.len())
    }

    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.lessons.iter().position(|l| l.id() == self.lesson.id())
    }

    #[must_use]
    pub fn next_lesson(&self) -> Option<&Lesson> {
        self.position().and_then(|idx| self.lessons.get(idx + 1))
    }
}

/// Drives a lesson page: loads content and progress, applies quiz completions,
/// and decides the next navigation or unlock.
#[derive(Clone)]
pub struct ProgressController {
    store: ProgressStore,
    catalog: Arc<dyn LessonCatalog>,
    config: ControllerConfig,
}

impl ProgressController {
    #[must_use]
    pub fn new(store: ProgressStore, catalog: Arc<dyn LessonCatalog>) -> Self {
        Self {
            store,
            catalog,
            config: ControllerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// `round(completed / total * 100)`; `0` when `total == 0`.
    #[must_use]
    pub fn compute_stats(completed: usize, total: usize) -> ProgressStats {
        ProgressStats::compute(completed, total)
    }

    /// Find a lesson and its level's ordered lesson list.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog cannot be read.
    /// A missing lesson is `LessonLookup::NotFound`, not an error.
    pub async fn load_lesson(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        lesson_id: &LessonId,
    ) -> Result<LessonLookup, ProgressServiceError> {
        let lessons = self.catalog.lessons(instructor, level).await?;
        match lessons.iter().find(|l| l.id() == lesson_id).cloned() {
            Some(lesson) => {
                debug!(%instructor, %level, lesson = %lesson_id, total = lessons.len(), "loaded lesson");
                Ok(LessonLookup::Found { lesson, lessons })
            }
            None => {
                warn!(%instructor, %level, lesson = %lesson_id, "lesson not in catalog");
                Ok(LessonLookup::NotFound)
            }
        }
    }

    /// Saved progress for a level; empty if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails.
    pub async fn load_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Vec<LessonProgress>, ProgressServiceError> {
        Ok(self
            .store
            .load(instructor, level)
            .await?
            .map(LevelProgress::into_records)
            .unwrap_or_default())
    }

    /// Load everything a lesson page needs.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or store cannot be read.
    pub async fn open(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        lesson_id: &LessonId,
    ) -> Result<PageLoad, ProgressServiceError> {
        let LessonLookup::Found { lesson, lessons } =
            self.load_lesson(instructor, level, lesson_id).await?
        else {
            return Ok(PageLoad::NotFound);
        };
        let progress = LevelProgress::from_records(self.load_progress(instructor, level).await?);
        let curriculum_complete = self.store.is_completed(instructor).await?;

        Ok(PageLoad::Ready(LessonSession {
            instructor: instructor.clone(),
            level: level.clone(),
            lesson,
            lessons,
            progress,
            curriculum_complete,
        }))
    }

    /// Record a finished quiz for the session's lesson and pick the next action.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persisting or the completion
    /// check fails, and `ProgressServiceError::UnknownLesson` if the session's
    /// lesson is missing from its own lesson list.
    pub async fn complete_quiz(
        &self,
        session: &mut LessonSession,
        score: QuizScore,
    ) -> Result<QuizCompletion, ProgressServiceError> {
        let lesson_id = session.lesson.id().clone();
        let saved = self
            .store
            .save(&session.instructor, &session.level, &lesson_id, true, score)
            .await?;

        let outcome = session
            .progress
            .apply_completion(&lesson_id, score, saved.completed_at());

        if session.position().is_none() {
            return Err(ProgressServiceError::UnknownLesson(lesson_id));
        }

        let next_action = if let Some(next) = session.next_lesson() {
            NextAction::NavigateToLesson {
                target: LessonTarget {
                    instructor: session.instructor.clone(),
                    level: session.level.clone(),
                    lesson: next.id().clone(),
                },
                after: self.config.advance_delay,
            }
        } else if self.store.is_completed(&session.instructor).await? {
            session.curriculum_complete = true;
            NextAction::UnlockFinalCode(session.instructor.clone())
        } else {
            NextAction::None
        };

        info!(
            instructor = %session.instructor,
            level = %session.level,
            lesson = %lesson_id,
            score = score.value(),
            ?outcome,
            ?next_action,
            "quiz completed"
        );

        Ok(QuizCompletion {
            progress: session.progress.records().to_vec(),
            outcome,
            next_action,
        })
    }
}
