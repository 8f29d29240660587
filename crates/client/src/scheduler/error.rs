//! Scheduler error types.

use std::time::Duration;

/// Errors raised by admission control itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Dropped from a full queue to make room for a newer task.
    #[error("scheduler overloaded: {scheduler} dropped the oldest queued task")]
    Overloaded { scheduler: String },
}

/// Outcome of [`super::Scheduler::schedule`] when the task did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError<E> {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The task's own error from its last attempt.
    #[error(transparent)]
    Task(E),
}

/// Errors that say whether another attempt may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Delay the upstream asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for SchedulerError {
    fn is_retryable(&self) -> bool {
        true
    }
}

impl<E: Retryable> Retryable for ScheduleError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            ScheduleError::Scheduler(err) => err.is_retryable(),
            ScheduleError::Task(err) => err.is_retryable(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ScheduleError::Scheduler(err) => err.retry_after(),
            ScheduleError::Task(err) => err.retry_after(),
        }
    }
}
