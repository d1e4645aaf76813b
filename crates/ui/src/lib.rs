#![forbid(unsafe_code)]

pub mod navigation;
pub mod routes;
pub mod vm;

pub use navigation::DeferredNavigation;
pub use routes::{HostRoute, RouteError};
pub use vm::{LessonPageVm, PageError, PagePhase, SidebarEntry};
