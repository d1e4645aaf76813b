use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bootcamp_core::model::{InstructorId, LessonProgress, LevelId, LevelProgress};
use thiserror::Error;

use crate::catalog::{InMemoryCatalog, LessonCatalog};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for per-lesson completion records.
///
/// Records are keyed by (instructor, level, lesson) and kept in insertion order
/// within a level.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert a record, or replace the record for the same lesson in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_lesson_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        record: &LessonProgress,
    ) -> Result<(), StorageError>;

    /// Fetch all records for one level. Returns `Ok(None)` when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn level_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Option<LevelProgress>, StorageError>;

    /// Fetch records for every level an instructor has progress in, ordered by level id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn instructor_progress(
        &self,
        instructor: &InstructorId,
    ) -> Result<Vec<(LevelId, LevelProgress)>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    levels: Arc<Mutex<BTreeMap<(InstructorId, LevelId), LevelProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_lesson_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
        record: &LessonProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .levels
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .entry((instructor.clone(), level.clone()))
            .or_default()
            .upsert(record.clone());
        Ok(())
    }

    async fn level_progress(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Option<LevelProgress>, StorageError> {
        let guard = self
            .levels
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(instructor.clone(), level.clone())).cloned())
    }

    async fn instructor_progress(
        &self,
        instructor: &InstructorId,
    ) -> Result<Vec<(LevelId, LevelProgress)>, StorageError> {
        let guard = self
            .levels
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|((owner, _), _)| owner == instructor)
            .map(|((_, level), progress)| (level.clone(), progress.clone()))
            .collect())
    }
}

/// Aggregates the progress repository and lesson catalog behind trait objects
/// for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub catalog: Arc<dyn LessonCatalog>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(catalog: InMemoryCatalog) -> Self {
        Self {
            progress: Arc::new(InMemoryRepository::new()),
            catalog: Arc::new(catalog),
        }
    }
}
