#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod progress_service;
pub mod queue_service;
pub mod sessions;

pub use vocab_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use config::{load_config, parse_config};
pub use error::{
    AppServicesError, ConfigLoadError, ProgressServiceError, QueueServiceError, SessionError,
};
pub use progress_service::ProgressService;
pub use queue_service::QueueService;

pub use sessions::{
    SessionAnswer, SessionAnswerResult, SessionProgress, SessionSummary, StudySession,
    StudySessionLoop,
};
