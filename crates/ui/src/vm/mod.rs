mod lesson_page_vm;

pub use lesson_page_vm::{LessonPageVm, PageError, PagePhase, SidebarEntry};
