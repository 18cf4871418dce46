//! Error taxonomy shared by the queue and its callers.

use std::time::Duration;

use thiserror::Error;

use crate::QueueState;

/// Errors raised by queue admission and lifecycle control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The worker buffer is full. Recoverable: mark the job failed and move on.
    #[error("max capacity reached")]
    MaxCapacity,

    #[error("queue is shutting down")]
    Closed,

    #[error("worker pool size must be at least 1, got {0}")]
    InvalidPoolSize(usize),

    #[error("queue cannot be started from state {0}")]
    AlreadyStarted(QueueState),

    #[error("queue did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("result collector unavailable: {0}")]
    Collector(String),
}

/// Errors surfaced by a run function. Recorded against the job, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),

    #[error("job panicked during execution")]
    Panicked,

    #[error("storage error: {0}")]
    Storage(String),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Configuration errors. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid number for {key}={value}")]
    InvalidNumber { key: String, value: String },

    #[error("invalid boolean for {key}={value} (expected true/false)")]
    InvalidBool { key: String, value: String },

    #[error("unsupported {key}={value} (expected {expected})")]
    Unsupported {
        key: String,
        value: String,
        expected: &'static str,
    },
}
