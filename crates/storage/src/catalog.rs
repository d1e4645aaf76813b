use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use bootcamp_core::model::{InstructorId, Lesson, LessonId, LevelId, QuizQuestion};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::repository::StorageError;

/// Errors raised while loading a catalog document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] bootcamp_core::Error),

    #[error("instructor {0} is listed more than once")]
    DuplicateInstructor(InstructorId),

    #[error("level {level} is listed more than once for instructor {instructor}")]
    DuplicateLevel {
        instructor: InstructorId,
        level: LevelId,
    },

    #[error("lesson {lesson} is listed more than once in level {level}")]
    DuplicateLesson { level: LevelId, lesson: LessonId },
}

/// Read-only source of lesson content.
///
/// Implementations must return lessons in a stable, deterministic order: that
/// order defines which lesson is "next".
#[async_trait]
pub trait LessonCatalog: Send + Sync {
    /// Ordered levels of an instructor's curriculum; empty for unknown instructors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing source cannot be read.
    async fn levels(&self, instructor: &InstructorId) -> Result<Vec<LevelId>, StorageError>;

    /// Ordered lessons of one level; empty for an unknown (instructor, level).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing source cannot be read.
    async fn lessons(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Vec<Lesson>, StorageError>;
}

#[derive(Debug, Clone)]
struct LevelEntry {
    id: LevelId,
    lessons: Vec<Lesson>,
}

#[derive(Debug, Clone)]
struct InstructorEntry {
    id: InstructorId,
    levels: Vec<LevelEntry>,
}

/// Catalog held entirely in memory, built in code or from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    instructors: Vec<InstructorEntry>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a level for an instructor. Levels keep insertion order.
    #[must_use]
    pub fn with_level(
        mut self,
        instructor: InstructorId,
        level: LevelId,
        lessons: Vec<Lesson>,
    ) -> Self {
        let entry = match self.instructors.iter().position(|i| i.id == instructor) {
            Some(idx) => &mut self.instructors[idx],
            None => {
                self.instructors.push(InstructorEntry {
                    id: instructor,
                    levels: Vec::new(),
                });
                let last = self.instructors.len() - 1;
                &mut self.instructors[last]
            }
        };
        match entry.levels.iter_mut().find(|l| l.id == level) {
            Some(existing) => existing.lessons = lessons,
            None => entry.levels.push(LevelEntry { id: level, lessons }),
        }
        self
    }

    /// Built-in single-lesson catalog used when no catalog file is configured.
    ///
    /// # Panics
    ///
    /// Panics if the embedded document is invalid.
    #[must_use]
    pub fn sample() -> Self {
        Self::from_json_str(SAMPLE_CATALOG).expect("embedded sample catalog should be valid")
    }

    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for malformed JSON, invalid lesson content, or
    /// duplicate instructors, levels, or lessons.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(raw)?;
        doc.into_catalog()
    }

    /// Read and parse a catalog document from disk.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`InMemoryCatalog::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn instructor(&self, id: &InstructorId) -> Option<&InstructorEntry> {
        self.instructors.iter().find(|i| i.id == *id)
    }
}

#[async_trait]
impl LessonCatalog for InMemoryCatalog {
    async fn levels(&self, instructor: &InstructorId) -> Result<Vec<LevelId>, StorageError> {
        Ok(self
            .instructor(instructor)
            .map(|i| i.levels.iter().map(|l| l.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn lessons(
        &self,
        instructor: &InstructorId,
        level: &LevelId,
    ) -> Result<Vec<Lesson>, StorageError> {
        Ok(self
            .instructor(instructor)
            .and_then(|i| i.levels.iter().find(|l| l.id == *level))
            .map(|l| l.lessons.clone())
            .unwrap_or_default())
    }
}

//
// ─── DOCUMENT FORMAT ───────────────────────────────────────────────────────────
//

const SAMPLE_CATALOG: &str = r#"{
  "instructors": [
    {
      "id": "alex",
      "levels": [
        {
          "id": "beginner",
          "lessons": [
            {
              "id": "lesson-1",
              "title": "Market Structure Basics",
              "description": "Understanding support and resistance levels",
              "videoUrl": "https://www.youtube.com/embed/dQw4w9WgXcQ",
              "quiz": [
                {
                  "question": "What is a support level?",
                  "options": ["Price floor", "Price ceiling", "Volatility measure"],
                  "answer": 0
                }
              ]
            }
          ]
        }
      ]
    }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    instructors: Vec<InstructorDocument>,
}

#[derive(Debug, Deserialize)]
struct InstructorDocument {
    id: InstructorId,
    levels: Vec<LevelDocument>,
}

#[derive(Debug, Deserialize)]
struct LevelDocument {
    id: LevelId,
    lessons: Vec<LessonDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonDocument {
    id: LessonId,
    title: String,
    #[serde(default)]
    description: String,
    video_url: Url,
    #[serde(default)]
    quiz: Vec<QuestionDocument>,
}

#[derive(Debug, Deserialize)]
struct QuestionDocument {
    question: String,
    options: Vec<String>,
    answer: usize,
}

impl CatalogDocument {
    fn into_catalog(self) -> Result<InMemoryCatalog, CatalogError> {
        let mut catalog = InMemoryCatalog::new();
        let mut seen_instructors = HashSet::new();
        for instructor in self.instructors {
            if !seen_instructors.insert(instructor.id.clone()) {
                return Err(CatalogError::DuplicateInstructor(instructor.id));
            }
            let mut seen_levels = HashSet::new();
            for level in instructor.levels {
                if !seen_levels.insert(level.id.clone()) {
                    return Err(CatalogError::DuplicateLevel {
                        instructor: instructor.id,
                        level: level.id,
                    });
                }
                let lessons = level.lessons_checked()?;
                catalog = catalog.with_level(instructor.id.clone(), level.id, lessons);
            }
        }
        Ok(catalog)
    }
}

impl LevelDocument {
    fn lessons_checked(&self) -> Result<Vec<Lesson>, CatalogError> {
        let mut seen = HashSet::new();
        let mut lessons = Vec::with_capacity(self.lessons.len());
        for doc in &self.lessons {
            if !seen.insert(doc.id.clone()) {
                return Err(CatalogError::DuplicateLesson {
                    level: self.id.clone(),
                    lesson: doc.id.clone(),
                });
            }
            lessons.push(doc.to_lesson()?);
        }
        Ok(lessons)
    }
}

impl LessonDocument {
    fn to_lesson(&self) -> Result<Lesson, bootcamp_core::Error> {
        let quiz = self
            .quiz
            .iter()
            .map(|q| QuizQuestion::new(q.question.clone(), q.options.clone(), q.answer))
            .collect::<Result<Vec<_>, _>>()?;
        let lesson = Lesson::new(
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.video_url.clone(),
            quiz,
        )?;
        Ok(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instructor(id: &str) -> InstructorId {
        InstructorId::new(id).unwrap()
    }

    fn level(id: &str) -> LevelId {
        LevelId::new(id).unwrap()
    }

    #[tokio::test]
    async fn sample_catalog_has_market_structure_lesson() {
        let catalog = InMemoryCatalog::sample();
        let lessons = catalog
            .lessons(&instructor("alex"), &level("beginner"))
            .await
            .unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id().as_str(), "lesson-1");
        assert_eq!(lessons[0].title(), "Market Structure Basics");
        assert_eq!(lessons[0].quiz()[0].answer(), 0);
    }

    #[tokio::test]
    async fn unknown_keys_yield_empty_lists() {
        let catalog = InMemoryCatalog::sample();
        assert!(catalog.levels(&instructor("nobody")).await.unwrap().is_empty());
        assert!(
            catalog
                .lessons(&instructor("alex"), &level("advanced"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn levels_keep_document_order() {
        let raw = r#"{"instructors":[{"id":"sam","levels":[
            {"id":"intermediate","lessons":[]},
            {"id":"beginner","lessons":[]}
        ]}]}"#;
        let catalog = InMemoryCatalog::from_json_str(raw).unwrap();
        let levels = catalog.levels(&instructor("sam")).await.unwrap();
        let names: Vec<_> = levels.iter().map(LevelId::as_str).collect();
        assert_eq!(names, ["intermediate", "beginner"]);
    }

    #[test]
    fn duplicate_lessons_are_rejected() {
        let raw = r#"{"instructors":[{"id":"sam","levels":[{"id":"beginner","lessons":[
            {"id":"l1","title":"One","videoUrl":"https://example.com/1"},
            {"id":"l1","title":"Again","videoUrl":"https://example.com/2"}
        ]}]}]}"#;
        let err = InMemoryCatalog::from_json_str(raw).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateLesson { .. }), "{err}");
    }

    #[test]
    fn invalid_quiz_is_rejected() {
        let raw = r#"{"instructors":[{"id":"sam","levels":[{"id":"beginner","lessons":[
            {"id":"l1","title":"One","videoUrl":"https://example.com/1",
             "quiz":[{"question":"Q","options":["a","b"],"answer":4}]}
        ]}]}]}"#;
        let err = InMemoryCatalog::from_json_str(raw).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)), "{err}");
    }

    #[test]
    fn bad_ids_fail_to_parse() {
        let raw = r#"{"instructors":[{"id":"bad/id","levels":[]}]}"#;
        let err = InMemoryCatalog::from_json_str(raw).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)), "{err}");
    }
}
