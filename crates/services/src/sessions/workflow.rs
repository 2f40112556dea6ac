use tracing::info;
use vocab_core::model::{Direction, Quality};

use super::service::{SessionAnswer, StudySession};
use crate::error::SessionError;
use crate::progress_service::ProgressService;
use crate::queue_service::QueueService;

/// Result of answering the current word in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub answer: SessionAnswer,
    pub is_complete: bool,
}

/// Orchestrates session start and persisted answering.
#[derive(Clone)]
pub struct StudySessionLoop {
    progress: ProgressService,
    queue: QueueService,
}

impl StudySessionLoop {
    #[must_use]
    pub fn new(progress: ProgressService, queue: QueueService) -> Self {
        Self { progress, queue }
    }

    /// Shuffle first exposures with a seeded RNG for every session started
    /// from this loop.
    #[must_use]
    pub fn with_new_word_shuffle(mut self, seed: u64) -> Self {
        self.queue = self.queue.with_new_word_shuffle(seed);
        self
    }

    /// Start a session over the current queue for `direction`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if nothing is due and the daily goal
    /// leaves no room, or storage failures.
    pub async fn start_session(&self, direction: Direction) -> Result<StudySession, SessionError> {
        let now = self.queue.now();
        let queue = self.queue.get_queue(direction, usize::MAX).await?;
        let session = StudySession::new(direction, queue, now)?;
        info!(
            "Started {direction} session with {} words queued",
            session.queue().len()
        );
        Ok(session)
    }

    /// Persist an answer for the current word, then rebuild the queue.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is finished, or
    /// progress/queue errors. A failed write leaves the session unchanged.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        quality: Quality,
    ) -> Result<SessionAnswerResult, SessionError> {
        let key = session.current().ok_or(SessionError::Completed)?.progress.key;

        let updated = self.progress.update_progress(key, quality).await?;
        let answered_at = updated.updated_at;
        let answer = session.record_answer(quality, updated, answered_at)?.clone();

        let queue = self.queue.get_queue(session.direction(), usize::MAX).await?;
        session.replace_queue(queue, self.queue.now());

        if session.is_complete() {
            let summary = session.summary();
            info!(
                "Finished {} session: {} answers over {} words ({} hard, {} medium, {} easy)",
                summary.direction,
                summary.total_answers,
                summary.distinct_words,
                summary.hard,
                summary.medium,
                summary.easy
            );
        }

        Ok(SessionAnswerResult {
            answer,
            is_complete: session.is_complete(),
        })
    }
}
