use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("quiz score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u32),

    #[error("a completed lesson must carry a quiz score")]
    MissingScore,
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// Percentage score for a lesson quiz, always in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QuizScore(u8);

impl QuizScore {
    pub const PERFECT: Self = Self(100);

    /// Creates a score from a percentage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ScoreOutOfRange` if `value > 100`.
    pub fn new(value: u32) -> Result<Self, ProgressError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ProgressError::ScoreOutOfRange(value))
    }

    /// Score for `correct` out of `total`, rounded half up.
    #[must_use]
    pub fn from_ratio(correct: usize, total: usize) -> Self {
        Self(rounded_percentage(correct, total))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for QuizScore {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizScore> for u32 {
    fn from(score: QuizScore) -> Self {
        u32::from(score.0)
    }
}

/// `round(part / whole * 100)` with halves rounded up; `0` when `whole == 0`.
///
/// `part` is saturated to `whole`, so the result never exceeds 100.
fn rounded_percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let whole = u128::try_from(whole).unwrap_or(u128::MAX);
    let part = u128::try_from(part).unwrap_or(u128::MAX).min(whole);
    let pct = (part * 200 + whole) / (whole * 2);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Completion record for a single lesson within an (instructor, level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    lesson_id: LessonId,
    completed: bool,
    quiz_score: Option<QuizScore>,
    completed_at: DateTime<Utc>,
}

impl LessonProgress {
    /// A freshly completed lesson.
    #[must_use]
    pub fn completed(lesson_id: LessonId, score: QuizScore, at: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            completed: true,
            quiz_score: Some(score),
            completed_at: at,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingScore` if the record is marked completed
    /// without a score.
    pub fn from_persisted(
        lesson_id: LessonId,
        completed: bool,
        quiz_score: Option<QuizScore>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if completed && quiz_score.is_none() {
            return Err(ProgressError::MissingScore);
        }
        Ok(Self {
            lesson_id,
            completed,
            quiz_score,
            completed_at,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn quiz_score(&self) -> Option<QuizScore> {
        self.quiz_score
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    fn mark_completed(&mut self, score: QuizScore) {
        self.completed = true;
        self.quiz_score = Some(score);
    }
}

//
// ─── LEVEL PROGRESS ────────────────────────────────────────────────────────────
//

/// How an upsert changed a `LevelProgress` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Appended,
    Updated,
}

/// Progress records for one (instructor, level), in insertion order.
///
/// Holds at most one record per lesson id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelProgress {
    records: Vec<LessonProgress>,
}

impl LevelProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from stored records; a later duplicate replaces the
    /// earlier record but keeps its position.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = LessonProgress>) -> Self {
        let mut progress = Self::new();
        for record in records {
            progress.upsert(record);
        }
        progress
    }

    #[must_use]
    pub fn records(&self) -> &[LessonProgress] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<LessonProgress> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, lesson_id: &LessonId) -> Option<&LessonProgress> {
        self.records.iter().find(|r| r.lesson_id == *lesson_id)
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: &LessonId) -> bool {
        self.get(lesson_id).is_some_and(LessonProgress::is_completed)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.completed).count()
    }

    /// Replace the record with the same lesson id in place, or append it.
    pub fn upsert(&mut self, record: LessonProgress) -> UpsertOutcome {
        match self
            .records
            .iter_mut()
            .find(|r| r.lesson_id == record.lesson_id)
        {
            Some(existing) => {
                *existing = record;
                UpsertOutcome::Updated
            }
            None => {
                self.records.push(record);
                UpsertOutcome::Appended
            }
        }
    }

    /// Mark a lesson completed with `score`.
    ///
    /// An existing record keeps its position and original timestamp; otherwise
    /// a new record stamped `at` is appended.
    pub fn apply_completion(
        &mut self,
        lesson_id: &LessonId,
        score: QuizScore,
        at: DateTime<Utc>,
    ) -> UpsertOutcome {
        if let Some(existing) = self.records.iter_mut().find(|r| r.lesson_id == *lesson_id) {
            existing.mark_completed(score);
            return UpsertOutcome::Updated;
        }
        self.records
            .push(LessonProgress::completed(lesson_id.clone(), score, at));
        UpsertOutcome::Appended
    }
}

//
// ─── PROGRESS STATS ────────────────────────────────────────────────────────────
//

/// Derived completion figures; recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStats {
    total: usize,
    completed: usize,
    percentage: u8,
}

impl ProgressStats {
    /// `percentage = round(completed / total * 100)`, `0` when `total == 0`.
    #[must_use]
    pub fn compute(completed: usize, total: usize) -> Self {
        let completed = completed.min(total);
        Self {
            total,
            completed,
            percentage: rounded_percentage(completed, total),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    /// True when there is at least one lesson and all of them are completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
