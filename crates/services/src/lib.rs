#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod progress_store;

pub use bootcamp_core::Clock;

pub use controller::{
    ControllerConfig, LessonLookup, LessonSession, LessonTarget, NextAction, PageLoad,
    ProgressController, QuizCompletion,
};
pub use error::ProgressServiceError;
pub use progress_store::ProgressStore;
