use std::fmt;
use std::str::FromStr;

use bootcamp_core::model::{InstructorId, LessonId, LevelId, ParseIdError};
use services::LessonTarget;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches {0:?}")]
    Unknown(String),
    #[error(transparent)]
    InvalidSegment(#[from] ParseIdError),
}

/// Paths the hosting page understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostRoute {
    /// `/`
    Home,
    /// `/instructor/{instructor}/{level}/{lesson}`
    Lesson(LessonTarget),
}

impl HostRoute {
    #[must_use]
    pub fn lesson(instructor: InstructorId, level: LevelId, lesson: LessonId) -> Self {
        Self::Lesson(LessonTarget {
            instructor,
            level,
            lesson,
        })
    }

    /// # Errors
    ///
    /// Returns `RouteError::Unknown` for unrecognised paths and
    /// `RouteError::InvalidSegment` when an id segment is malformed.
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::Home);
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            ["", "instructor", instructor, level, lesson] => Ok(Self::lesson(
                instructor.parse()?,
                level.parse()?,
                lesson.parse()?,
            )),
            _ => Err(RouteError::Unknown(path.to_string())),
        }
    }
}

impl fmt::Display for HostRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRoute::Home => f.write_str("/"),
            HostRoute::Lesson(target) => write!(
                f,
                "/instructor/{}/{}/{}",
                target.instructor, target.level, target.lesson
            ),
        }
    }
}

impl FromStr for HostRoute {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
