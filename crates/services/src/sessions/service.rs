use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use vocab_core::model::{Direction, ProgressKey, Quality, WordId, WordProgress, WordWithProgress};

use super::progress::SessionProgress;
use super::summary::SessionSummary;
use crate::error::SessionError;

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One answer given during a session and the record it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswer {
    pub key: ProgressKey,
    pub quality: Quality,
    /// Whether the word was in the learning phase before this answer.
    pub was_learning: bool,
    pub progress: WordProgress,
    pub answered_at: DateTime<Utc>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study session for one direction.
///
/// Holds the current queue snapshot; the session loop replaces it after
/// every persisted answer, so re-shown learning words and newly due words
/// appear without restarting.
pub struct StudySession {
    direction: Direction,
    queue: Vec<WordWithProgress>,
    answers: Vec<SessionAnswer>,
    studied: HashSet<WordId>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl StudySession {
    /// Start a session over a queue snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the queue is empty.
    pub fn new(
        direction: Direction,
        queue: Vec<WordWithProgress>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if queue.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            direction,
            queue,
            answers: Vec::new(),
            studied: HashSet::new(),
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn answers(&self) -> &[SessionAnswer] {
        &self.answers
    }

    /// The queue as it stood after the last answer.
    #[must_use]
    pub fn queue(&self) -> &[WordWithProgress] {
        &self.queue
    }

    #[must_use]
    pub fn current(&self) -> Option<&WordWithProgress> {
        if self.is_complete() {
            None
        } else {
            self.queue.first()
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            answered: self.answers.len(),
            distinct_studied: self.studied.len(),
            remaining: if self.is_complete() { 0 } else { self.queue.len() },
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_answers(
            self.direction,
            self.started_at,
            self.completed_at,
            &self.answers,
        )
    }

    /// End the session early. Answers already given stay persisted.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        if self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
    }

    pub(crate) fn record_answer(
        &mut self,
        quality: Quality,
        progress: WordProgress,
        answered_at: DateTime<Utc>,
    ) -> Result<&SessionAnswer, SessionError> {
        let was_learning = self
            .current()
            .ok_or(SessionError::Completed)?
            .progress
            .learning_phase;

        self.studied.insert(progress.word_id());
        self.answers.push(SessionAnswer {
            key: progress.key,
            quality,
            was_learning,
            progress,
            answered_at,
        });
        self.answers.last().ok_or(SessionError::Completed)
    }

    /// Swap in a freshly built queue; an empty one completes the session.
    pub(crate) fn replace_queue(&mut self, queue: Vec<WordWithProgress>, now: DateTime<Utc>) {
        self.queue = queue;
        if self.queue.is_empty() {
            self.finish(now);
        }
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("direction", &self.direction)
            .field("queue_len", &self.queue.len())
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
