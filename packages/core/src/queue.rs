//! Queue lifecycle and status types.

use serde::{Deserialize, Serialize};

/// Lifecycle of a dispatch queue. Transitions only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Constructed, executors not launched yet.
    #[default]
    Created,
    /// Executors are pulling jobs.
    Running,
    /// Shutdown was signalled; buffered jobs are still being finished.
    Draining,
    /// Every executor has exited.
    Stopped,
}

impl QueueState {
    /// Check if the queue still admits new jobs.
    pub fn is_accepting_jobs(&self) -> bool {
        matches!(self, QueueState::Created | QueueState::Running)
    }
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Created => write!(f, "created"),
            QueueState::Running => write!(f, "running"),
            QueueState::Draining => write!(f, "draining"),
            QueueState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Application status snapshot served to monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    pub version: String,
    pub queue_max: usize,
    pub queue_usage: usize,
    pub total_count: u64,
}
