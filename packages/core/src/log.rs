//! Per-target result log entries returned to synchronous submitters.

use serde::{Deserialize, Serialize};

use crate::Job;

const MASK_LEN: usize = 10;

/// Outcome recorded for one sub-target of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushStatus {
    #[serde(rename = "succeeded-push")]
    Succeeded,
    #[serde(rename = "failed-push")]
    Failed,
}

impl PushStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushStatus::Succeeded => "succeeded-push",
            PushStatus::Failed => "failed-push",
        }
    }
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a batch result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub status: PushStatus,
    pub platform: i32,
    #[serde(rename = "token")]
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    pub fn is_failed(&self) -> bool {
        self.status == PushStatus::Failed
    }
}

/// Builds entries for every target of a job with a shared outcome.
pub fn entries_for(job: &Job, error: Option<&str>, hide_token: bool) -> Vec<LogEntry> {
    let status = if error.is_some() {
        PushStatus::Failed
    } else {
        PushStatus::Succeeded
    };
    let id = job.log_id();
    let message = job.message();

    job.targets()
        .into_iter()
        .map(|target| LogEntry {
            id: id.clone(),
            status,
            platform: job.platform(),
            target: if hide_token {
                hide_target(target)
            } else {
                target.to_string()
            },
            message: message.clone(),
            error: error.map(str::to_string),
        })
        .collect()
}

/// Masks the leading and trailing characters of a token.
///
/// Tokens too short to keep a visible middle are masked completely.
pub fn hide_target(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < MASK_LEN * 2 {
        return "*".repeat(chars.len());
    }

    let middle: String = chars[MASK_LEN..chars.len() - MASK_LEN].iter().collect();
    format!("{}{middle}{}", "*".repeat(MASK_LEN), "*".repeat(MASK_LEN))
}
