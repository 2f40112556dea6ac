use std::sync::Arc;

use storage::repository::Storage;
use vocab_core::{Scheduler, StudyConfig};

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::queue_service::QueueService;
use crate::sessions::StudySessionLoop;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    config: StudyConfig,
    progress: Arc<ProgressService>,
    queue: Arc<QueueService>,
    session_loop: Arc<StudySessionLoop>,
}

impl AppServices {
    /// Wire services over an existing storage backend.
    #[must_use]
    pub fn new(storage: &Storage, config: StudyConfig, clock: Clock) -> Self {
        let progress = ProgressService::new(
            clock.clone(),
            Scheduler::new(config.scheduler.clone()),
            Arc::clone(&storage.words),
            Arc::clone(&storage.progress),
        );
        let queue = QueueService::new(
            clock,
            &config,
            Arc::clone(&storage.words),
            Arc::clone(&storage.progress),
        );
        let session_loop = StudySessionLoop::new(progress.clone(), queue.clone());

        Self {
            config,
            progress: Arc::new(progress),
            queue: Arc::new(queue),
            session_loop: Arc::new(session_loop),
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        config: StudyConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, config, clock))
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn queue(&self) -> Arc<QueueService> {
        Arc::clone(&self.queue)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<StudySessionLoop> {
        Arc::clone(&self.session_loop)
    }
}
