use bootcamp_core::model::{
    InstructorId, Lesson, LessonError, LessonId, ProgressStats, QuizScore,
};
use services::{
    LessonSession, LessonTarget, NextAction, PageLoad, ProgressController, ProgressServiceError,
};
use thiserror::Error;
use tracing::info;

use crate::navigation::DeferredNavigation;
use crate::routes::HostRoute;

/// Display states of a lesson page.
///
/// `Loading -> Ready -> (QuizActive -> Ready)* -> {LevelComplete | BootcampUnlocked}`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagePhase {
    /// Initial state; stays here for good if the lesson does not exist.
    Loading,
    Ready,
    QuizActive,
    /// Last lesson of the level done while the curriculum is still incomplete.
    LevelComplete,
    /// Terminal for this page instance.
    BootcampUnlocked,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PageError {
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition {
        phase: PagePhase,
        action: &'static str,
    },
    #[error("lesson has no quiz")]
    NoQuiz,
    #[error(transparent)]
    Grade(#[from] LessonError),
    #[error(transparent)]
    Service(#[from] ProgressServiceError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidebarEntry {
    pub lesson_id: LessonId,
    pub title: String,
    pub completed: bool,
    pub current: bool,
    pub route: HostRoute,
}

/// View model behind a lesson page.
pub struct LessonPageVm {
    controller: ProgressController,
    target: LessonTarget,
    phase: PagePhase,
    session: Option<LessonSession>,
    not_found: bool,
    last_action: Option<NextAction>,
    pending: Option<DeferredNavigation>,
}

impl LessonPageVm {
    #[must_use]
    pub fn new(controller: ProgressController, target: LessonTarget) -> Self {
        Self {
            controller,
            target,
            phase: PagePhase::Loading,
            session: None,
            not_found: false,
            last_action: None,
            pending: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    #[must_use]
    pub fn target(&self) -> &LessonTarget {
        &self.target
    }

    /// True once the catalog lookup missed; the page then never leaves `Loading`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    #[must_use]
    pub fn lesson(&self) -> Option<&Lesson> {
        self.session.as_ref().map(LessonSession::lesson)
    }

    #[must_use]
    pub fn session(&self) -> Option<&LessonSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> Option<ProgressStats> {
        self.session.as_ref().map(LessonSession::stats)
    }

    #[must_use]
    pub fn last_action(&self) -> Option<&NextAction> {
        self.last_action.as_ref()
    }

    /// Instructor whose final code is on screen, once unlocked.
    #[must_use]
    pub fn unlocked_instructor(&self) -> Option<&InstructorId> {
        match self.last_action {
            Some(NextAction::UnlockFinalCode(ref instructor)) => Some(instructor),
            _ => None,
        }
    }

    #[must_use]
    pub fn sidebar(&self) -> Vec<SidebarEntry> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        session
            .lessons()
            .iter()
            .map(|lesson| SidebarEntry {
                lesson_id: lesson.id().clone(),
                title: lesson.title().to_string(),
                completed: session.progress().is_lesson_completed(lesson.id()),
                current: lesson.id() == session.lesson().id(),
                route: HostRoute::lesson(
                    session.instructor().clone(),
                    session.level().clone(),
                    lesson.id().clone(),
                ),
            })
            .collect()
    }

    /// Resolve the lesson and saved progress.
    ///
    /// A missing lesson leaves the page in `Loading`; later calls do not retry.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Service` if the catalog or store cannot be read, and
    /// `PageError::InvalidTransition` if the page already loaded.
    pub async fn load(&mut self) -> Result<PagePhase, PageError> {
        if self.phase != PagePhase::Loading {
            return Err(self.invalid("load"));
        }
        if self.not_found {
            return Ok(self.phase);
        }
        let target = &self.target;
        match self
            .controller
            .open(&target.instructor, &target.level, &target.lesson)
            .await?
        {
            PageLoad::Ready(session) => {
                self.session = Some(session);
                self.phase = PagePhase::Ready;
            }
            PageLoad::NotFound => self.not_found = true,
        }
        Ok(self.phase)
    }

    /// Open the quiz ("take quiz").
    ///
    /// # Errors
    ///
    /// Returns `PageError::InvalidTransition` outside `Ready`/`LevelComplete`,
    /// and `PageError::NoQuiz` if the lesson has no questions.
    pub fn begin_quiz(&mut self) -> Result<(), PageError> {
        if !matches!(self.phase, PagePhase::Ready | PagePhase::LevelComplete) {
            return Err(self.invalid("begin quiz"));
        }
        if !self.lesson().is_some_and(Lesson::has_quiz) {
            return Err(PageError::NoQuiz);
        }
        self.phase = PagePhase::QuizActive;
        Ok(())
    }

    /// Grade raw answers against the lesson's quiz, then submit the score.
    ///
    /// # Errors
    ///
    /// As [`LessonPageVm::submit_quiz`], plus `PageError::Grade` for a wrong
    /// answer count.
    pub async fn submit_answers(&mut self, answers: &[usize]) -> Result<&NextAction, PageError> {
        if self.phase != PagePhase::QuizActive {
            return Err(self.invalid("submit quiz"));
        }
        let score = match self.lesson() {
            Some(lesson) => lesson.grade_quiz(answers)?,
            None => return Err(self.invalid("submit quiz")),
        };
        self.submit_quiz(score).await
    }

    /// Complete the quiz with `score` and act on the controller's decision.
    ///
    /// # Errors
    ///
    /// Returns `PageError::InvalidTransition` unless the quiz is active, and
    /// `PageError::Service` if progress cannot be saved; the quiz stays active
    /// in that case.
    pub async fn submit_quiz(&mut self, score: QuizScore) -> Result<&NextAction, PageError> {
        if self.phase != PagePhase::QuizActive {
            return Err(self.invalid("submit quiz"));
        }
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or(PageError::InvalidTransition {
                phase,
                action: "submit quiz",
            })?;
        let completion = self.controller.complete_quiz(session, score).await?;

        self.phase = match &completion.next_action {
            NextAction::NavigateToLesson { target, after } => {
                let route = HostRoute::Lesson(target.clone());
                self.pending = Some(DeferredNavigation::schedule(route, *after));
                PagePhase::Ready
            }
            NextAction::UnlockFinalCode(instructor) => {
                info!(%instructor, "bootcamp unlocked");
                self.pending = None;
                PagePhase::BootcampUnlocked
            }
            NextAction::None => PagePhase::LevelComplete,
        };

        Ok(self.last_action.insert(completion.next_action))
    }

    /// Hand the scheduled navigation to the host, if any.
    pub fn take_navigation(&mut self) -> Option<DeferredNavigation> {
        self.pending.take()
    }

    /// Leave the final code screen.
    ///
    /// # Errors
    ///
    /// Returns `PageError::InvalidTransition` unless the bootcamp is unlocked.
    pub fn finish_final_code(&self) -> Result<HostRoute, PageError> {
        if self.phase != PagePhase::BootcampUnlocked {
            return Err(self.invalid("leave final code"));
        }
        Ok(HostRoute::Home)
    }

    fn invalid(&self, action: &'static str) -> PageError {
        PageError::InvalidTransition {
            phase: self.phase,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use bootcamp_core::model::{LevelId, QuizQuestion};
    use bootcamp_core::time::fixed_now;
    use services::{Clock, ControllerConfig, ProgressStore};
    use storage::catalog::InMemoryCatalog;
    use storage::repository::Storage;
    use tokio::sync::oneshot::error::TryRecvError;

    fn lesson(id: &str) -> Lesson {
        let quiz = vec![
            QuizQuestion::new("Q1", vec!["a".into(), "b".into()], 0).unwrap(),
            QuizQuestion::new("Q2", vec!["a".into(), "b".into()], 1).unwrap(),
        ];
        Lesson::new(
            LessonId::new(id).unwrap(),
            format!("Lesson {id}"),
            "",
            "https://example.com/video".parse().unwrap(),
            quiz,
        )
        .unwrap()
    }

    fn quizless(id: &str) -> Lesson {
        Lesson::new(
            LessonId::new(id).unwrap(),
            format!("Reading {id}"),
            "",
            "https://example.com/video".parse().unwrap(),
            Vec::new(),
        )
        .unwrap()
    }

    fn instructor() -> InstructorId {
        InstructorId::new("alex").unwrap()
    }

    fn level() -> LevelId {
        LevelId::new("beginner").unwrap()
    }

    fn target(lesson: &str) -> LessonTarget {
        LessonTarget {
            instructor: instructor(),
            level: level(),
            lesson: LessonId::new(lesson).unwrap(),
        }
    }

    fn controller(lessons: Vec<Lesson>) -> ProgressController {
        let catalog = InMemoryCatalog::new().with_level(instructor(), level(), lessons);
        let storage = Storage::in_memory(catalog);
        let store = ProgressStore::from_storage(Clock::fixed(fixed_now()), &storage);
        ProgressController::new(store, Arc::clone(&storage.catalog))
    }

    fn score(v: u32) -> QuizScore {
        QuizScore::new(v).unwrap()
    }

    #[tokio::test]
    async fn missing_lesson_stays_loading() {
        let mut vm = LessonPageVm::new(controller(vec![lesson("L1")]), target("nope"));

        assert_eq!(vm.load().await.unwrap(), PagePhase::Loading);
        assert!(vm.is_not_found());
        assert!(vm.lesson().is_none());
        assert!(vm.sidebar().is_empty());
        assert_eq!(vm.load().await.unwrap(), PagePhase::Loading);
        assert!(matches!(
            vm.begin_quiz(),
            Err(PageError::InvalidTransition {
                phase: PagePhase::Loading,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn quiz_flow_schedules_next_lesson() {
        let controller = controller(vec![lesson("L1"), lesson("L2"), lesson("L3")]);
        let mut vm = LessonPageVm::new(controller, target("L1"));
        assert_eq!(vm.load().await.unwrap(), PagePhase::Ready);
        assert_eq!(vm.stats().unwrap().percentage(), 0);

        vm.begin_quiz().unwrap();
        assert_eq!(vm.phase(), PagePhase::QuizActive);
        let action = vm.submit_answers(&[0, 1]).await.unwrap().clone();

        assert!(matches!(action, NextAction::NavigateToLesson { .. }));
        assert_eq!(vm.phase(), PagePhase::Ready);
        assert_eq!(vm.stats().unwrap().percentage(), 33);

        let nav = vm.take_navigation().expect("navigation scheduled");
        assert_eq!(nav.delay(), Duration::from_secs(1));
        let route = nav.wait().await.expect("timer fired");
        assert_eq!(route.to_string(), "/instructor/alex/beginner/L2");
    }

    #[tokio::test]
    async fn sidebar_marks_current_and_completed() {
        let controller = controller(vec![lesson("L1"), lesson("L2")]);
        let mut vm = LessonPageVm::new(controller, target("L2"));
        vm.load().await.unwrap();
        vm.begin_quiz().unwrap();
        vm.submit_quiz(score(100)).await.unwrap();

        let sidebar = vm.sidebar();
        assert_eq!(sidebar.len(), 2);
        assert!(!sidebar[0].completed && !sidebar[0].current);
        assert!(sidebar[1].completed && sidebar[1].current);
        assert_eq!(sidebar[0].route.to_string(), "/instructor/alex/beginner/L1");
    }

    #[tokio::test]
    async fn last_lesson_of_incomplete_curriculum_completes_level() {
        let catalog = InMemoryCatalog::new()
            .with_level(instructor(), level(), vec![lesson("L1")])
            .with_level(instructor(), LevelId::new("advanced").unwrap(), vec![lesson("A1")]);
        let storage = Storage::in_memory(catalog);
        let store = ProgressStore::from_storage(Clock::fixed(fixed_now()), &storage);
        let controller = ProgressController::new(store, Arc::clone(&storage.catalog));
        let mut vm = LessonPageVm::new(controller, target("L1"));
        vm.load().await.unwrap();
        vm.begin_quiz().unwrap();

        let action = vm.submit_quiz(score(70)).await.unwrap();
        assert_eq!(action, &NextAction::None);
        assert_eq!(vm.phase(), PagePhase::LevelComplete);
        assert!(vm.take_navigation().is_none());

        vm.begin_quiz().unwrap();
        assert_eq!(vm.phase(), PagePhase::QuizActive);
    }

    #[tokio::test]
    async fn completing_curriculum_unlocks_final_code() {
        let controller = controller(vec![lesson("L1")]);
        let mut vm = LessonPageVm::new(controller, target("L1"));
        vm.load().await.unwrap();
        assert!(vm.finish_final_code().is_err());
        vm.begin_quiz().unwrap();

        let action = vm.submit_quiz(score(100)).await.unwrap();
        assert_eq!(action, &NextAction::UnlockFinalCode(instructor()));
        assert_eq!(vm.phase(), PagePhase::BootcampUnlocked);
        assert_eq!(vm.unlocked_instructor(), Some(&instructor()));

        assert!(vm.begin_quiz().is_err());
        assert!(vm.submit_quiz(score(100)).await.is_err());
        assert_eq!(vm.finish_final_code().unwrap(), HostRoute::Home);
    }

    #[tokio::test]
    async fn submit_requires_active_quiz() {
        let controller = controller(vec![lesson("L1"), lesson("L2")]);
        let mut vm = LessonPageVm::new(controller, target("L1"));
        vm.load().await.unwrap();
        let err = vm.submit_quiz(score(10)).await.unwrap_err();
        assert!(matches!(
            err,
            PageError::InvalidTransition {
                phase: PagePhase::Ready,
                ..
            }
        ));
        assert!(vm.load().await.is_err());
    }

    #[tokio::test]
    async fn lesson_without_quiz_cannot_start_one() {
        let controller = controller(vec![quizless("R1")]);
        let mut vm = LessonPageVm::new(controller, target("R1"));
        vm.load().await.unwrap();
        assert!(matches!(vm.begin_quiz(), Err(PageError::NoQuiz)));
        assert_eq!(vm.phase(), PagePhase::Ready);
    }

    #[tokio::test]
    async fn wrong_answer_count_keeps_quiz_open() {
        let controller = controller(vec![lesson("L1"), lesson("L2")]);
        let mut vm = LessonPageVm::new(controller, target("L1"));
        vm.load().await.unwrap();
        vm.begin_quiz().unwrap();
        assert!(matches!(
            vm.submit_answers(&[0]).await,
            Err(PageError::Grade(_))
        ));
        assert_eq!(vm.phase(), PagePhase::QuizActive);
    }

    async fn page_with_pending_navigation(delay: Duration) -> LessonPageVm {
        let controller = controller(vec![lesson("L1"), lesson("L2")]).with_config(ControllerConfig {
            advance_delay: delay,
        });
        let mut vm = LessonPageVm::new(controller, target("L1"));
        vm.load().await.unwrap();
        vm.begin_quiz().unwrap();
        vm.submit_quiz(score(100)).await.unwrap();
        vm
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_page_cancels_pending_navigation() {
        let mut vm = page_with_pending_navigation(Duration::from_millis(500)).await;
        let pending = vm.pending.as_mut().expect("navigation scheduled");
        assert_eq!(pending.delay(), Duration::from_millis(500));
        let mut rx = pending.take_receiver().unwrap();

        drop(vm);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_replaces_pending_navigation() {
        let mut vm = page_with_pending_navigation(Duration::from_millis(500)).await;
        let mut first = vm.pending.as_mut().unwrap().take_receiver().unwrap();

        vm.begin_quiz().unwrap();
        vm.submit_quiz(score(80)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(first.try_recv(), Err(TryRecvError::Closed));
        let route = vm.take_navigation().unwrap().wait().await;
        let expected = HostRoute::lesson(instructor(), level(), LessonId::new("L2").unwrap());
        assert_eq!(route, Some(expected));
    }
}
