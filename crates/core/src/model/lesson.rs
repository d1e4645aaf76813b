use thiserror::Error;
use url::Url;

use crate::model::ids::LessonId;
use crate::model::progress::QuizScore;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("quiz question prompt cannot be empty")]
    EmptyPrompt,

    #[error("quiz question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct option {answer} is out of range for {options} options")]
    AnswerOutOfRange { answer: usize, options: usize },

    #[error("expected {expected} quiz answers, got {got}")]
    AnswerCountMismatch { expected: usize, got: usize },
}

//
// ─── QUIZ QUESTION ─────────────────────────────────────────────────────────────
//

/// A single multiple-choice question attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    prompt: String,
    options: Vec<String>,
    answer: usize,
}

impl QuizQuestion {
    /// Creates a validated quiz question.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyPrompt` for a blank prompt,
    /// `LessonError::TooFewOptions` with fewer than two options, and
    /// `LessonError::AnswerOutOfRange` if `answer` does not index an option.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        answer: usize,
    ) -> Result<Self, LessonError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(LessonError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(LessonError::TooFewOptions(options.len()));
        }
        if answer >= options.len() {
            return Err(LessonError::AnswerOutOfRange {
                answer,
                options: options.len(),
            });
        }
        Ok(Self {
            prompt,
            options,
            answer,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> usize {
        self.answer
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A video lesson with its quiz. Immutable once loaded from a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: String,
    video_url: Url,
    quiz: Vec<QuizQuestion>,
}

impl Lesson {
    /// Creates a lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        description: impl Into<String>,
        video_url: Url,
        quiz: Vec<QuizQuestion>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            description: description.into(),
            video_url,
            quiz,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn video_url(&self) -> &Url {
        &self.video_url
    }

    #[must_use]
    pub fn quiz(&self) -> &[QuizQuestion] {
        &self.quiz
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        !self.quiz.is_empty()
    }

    /// Grades chosen option indices, one per question, into a percentage score.
    ///
    /// A lesson without questions grades to a perfect score.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::AnswerCountMismatch` if `answers` does not have one
    /// entry per question.
    pub fn grade_quiz(&self, answers: &[usize]) -> Result<QuizScore, LessonError> {
        if answers.len() != self.quiz.len() {
            return Err(LessonError::AnswerCountMismatch {
                expected: self.quiz.len(),
                got: answers.len(),
            });
        }
        if self.quiz.is_empty() {
            return Ok(QuizScore::PERFECT);
        }
        let correct = self
            .quiz
            .iter()
            .zip(answers)
            .filter(|(question, choice)| question.is_correct(**choice))
            .count();
        Ok(QuizScore::from_ratio(correct, self.quiz.len()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn lesson_with(quiz: Vec<QuizQuestion>) -> Lesson {
        Lesson::new(
            LessonId::new("lesson-1").unwrap(),
            "Market Structure Basics",
            "Understanding support and resistance levels",
            Url::parse("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            quiz,
        )
        .unwrap()
    }

    #[test]
    fn question_validation() {
        assert_eq!(
            QuizQuestion::new(" ", options(3), 0).unwrap_err(),
            LessonError::EmptyPrompt
        );
        assert_eq!(
            QuizQuestion::new("Q", options(1), 0).unwrap_err(),
            LessonError::TooFewOptions(1)
        );
        assert_eq!(
            QuizQuestion::new("Q", options(3), 3).unwrap_err(),
            LessonError::AnswerOutOfRange {
                answer: 3,
                options: 3
            }
        );
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Lesson::new(
            LessonId::new("x").unwrap(),
            "",
            "",
            Url::parse("https://example.com/v").unwrap(),
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn grade_quiz_rounds_percentage() {
        let quiz = vec![
            QuizQuestion::new("Q1", options(3), 0).unwrap(),
            QuizQuestion::new("Q2", options(3), 1).unwrap(),
            QuizQuestion::new("Q3", options(3), 2).unwrap(),
        ];
        let lesson = lesson_with(quiz);
        assert_eq!(lesson.grade_quiz(&[0, 1, 2]).unwrap().value(), 100);
        assert_eq!(lesson.grade_quiz(&[0, 1, 0]).unwrap().value(), 67);
        assert_eq!(lesson.grade_quiz(&[1, 0, 0]).unwrap().value(), 0);
    }

    #[test]
    fn grade_quiz_requires_one_answer_per_question() {
        let lesson = lesson_with(vec![QuizQuestion::new("Q", options(2), 0).unwrap()]);
        let err = lesson.grade_quiz(&[]).unwrap_err();
        assert_eq!(
            err,
            LessonError::AnswerCountMismatch {
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn empty_quiz_grades_perfect() {
        let lesson = lesson_with(Vec::new());
        assert!(!lesson.has_quiz());
        assert_eq!(lesson.grade_quiz(&[]).unwrap(), QuizScore::PERFECT);
    }
}
