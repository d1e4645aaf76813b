mod ids;
mod lesson;
mod progress;

pub use ids::{InstructorId, LessonId, LevelId, ParseIdError};

pub use lesson::{Lesson, LessonError, QuizQuestion};
pub use progress::{
    LessonProgress, LevelProgress, ProgressError, ProgressStats, QuizScore, UpsertOutcome,
};
