mod progress;
mod service;
mod summary;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{SessionAnswer, StudySession};
pub use summary::SessionSummary;
pub use workflow::{SessionAnswerResult, StudySessionLoop};
