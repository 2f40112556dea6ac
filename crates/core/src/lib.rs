//! Spaced-repetition scheduling for vocabulary study.
//!
//! - [`scheduler`]: the pure progress update engine (SM-2 variant)
//! - [`queue`]: turns a snapshot of progress records into an ordered session
//! - [`model`]: ids, directions, words and per-direction progress records
#![forbid(unsafe_code)]

pub mod config;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod time;

pub use config::{ConfigError, QueueConfig, SchedulerConfig, StudyConfig};
pub use queue::{QueueBuilder, QueueBucket, QueueCounts, QueueEntry, StudyQueue};
pub use scheduler::Scheduler;
pub use time::Clock;
