//! Shared error types for the services crate.

use thiserror::Error;

use bootcamp_core::model::{LessonId, ProgressError};
use storage::repository::StorageError;

/// Errors emitted by `ProgressStore` and `ProgressController`.
///
/// A lesson missing from the catalog is not an error; see `LessonLookup::NotFound`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("lesson {0} is not part of the loaded level")]
    UnknownLesson(LessonId),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
