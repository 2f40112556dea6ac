//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::ConfigError;
use vocab_core::model::{ProgressKey, QualityError, WordError, WordId};

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("no progress record for {0}")]
    NotFound(ProgressKey),
    #[error("word {0} does not exist")]
    WordNotFound(WordId),
    #[error(transparent)]
    InvalidQuality(#[from] QualityError),
    #[error(transparent)]
    InvalidWord(#[from] WordError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QueueService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueueServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by study sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no words available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Queue(#[from] QueueServiceError),
}

/// Errors emitted while reading a study configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
}
