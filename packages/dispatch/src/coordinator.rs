//! Batch submission with optional synchronous completion.

use std::sync::Arc;

use ractor::ActorRef;
use scrape_core::{Job, LogEntry, QueueError, entries_for};

use crate::collector::{CollectorMessage, ResultLog};
use crate::latch::Latch;
use crate::queue::Queue;
use crate::worker::{QueuedJob, Rejected, Worker};

/// Back-reference from a tracked job to its batch.
///
/// Finishing appends the job's log entries and then counts the latch down,
/// so the entries are queued at the collector before the submitter wakes.
pub struct Tracker {
    latch: Latch,
    log: ActorRef<CollectorMessage>,
    hide_token: bool,
}

impl Tracker {
    pub fn new(latch: Latch, log: ActorRef<CollectorMessage>, hide_token: bool) -> Self {
        Self {
            latch,
            log,
            hide_token,
        }
    }

    pub fn finish(self, job: &Job, error: Option<&str>) {
        let entries = entries_for(job, error, self.hide_token);
        if let Err(e) = self.log.send_message(CollectorMessage::Append(entries)) {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to record job result");
        }
        self.latch.count_down();
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("pending", &self.latch.count())
            .field("hide_token", &self.hide_token)
            .finish()
    }
}

/// Result of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Sub-targets accepted for processing, rejected ones included.
    pub count: usize,
    /// Per-target outcomes. Empty unless the batch ran synchronously.
    /// Order is unspecified.
    pub logs: Vec<LogEntry>,
}

/// Submission entry point shared by request handlers.
pub struct Coordinator<W: Worker> {
    queue: Arc<Queue<W>>,
    hide_token: bool,
}

impl<W: Worker> Clone for Coordinator<W> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            hide_token: self.hide_token,
        }
    }
}

impl<W: Worker> Coordinator<W> {
    pub fn new(queue: Arc<Queue<W>>) -> Self {
        Self {
            queue,
            hide_token: false,
        }
    }

    /// Mask targets in returned log entries.
    pub fn with_hide_token(mut self, hide_token: bool) -> Self {
        self.hide_token = hide_token;
        self
    }

    pub fn queue(&self) -> &Arc<Queue<W>> {
        &self.queue
    }

    /// Enqueue every job of a batch.
    ///
    /// In synchronous mode this returns only after every job has either run
    /// or been rejected at admission, with one log entry per target. Workers
    /// that cannot report completion turn a synchronous request into a
    /// fire-and-forget one.
    pub async fn submit(&self, jobs: Vec<Job>, sync: bool) -> Result<Submission, QueueError> {
        let count = jobs.iter().map(Job::sub_target_count).sum();
        if jobs.is_empty() {
            return Ok(Submission::default());
        }

        let sync = if sync && !self.queue.supports_sync() {
            tracing::debug!("Worker cannot report completion, submitting asynchronously");
            false
        } else {
            sync
        };

        if !sync {
            for job in jobs {
                if let Err(Rejected { job, error }) = self.queue.enqueue(job.into()) {
                    tracing::warn!(job_id = %job.job().id, error = %error, "Job rejected");
                }
            }
            return Ok(Submission {
                count,
                logs: Vec::new(),
            });
        }

        let log = ResultLog::spawn().await?;
        let latch = Latch::new();
        let total = jobs.len();
        let mut rejected = 0usize;

        for job in jobs {
            latch.add(1);
            let tracker = Tracker::new(latch.clone(), log.sink(), self.hide_token);
            if let Err(rejection) = self.queue.enqueue(QueuedJob::tracked(job, tracker)) {
                tracing::warn!(
                    job_id = %rejection.job.job().id,
                    error = %rejection.error,
                    "Job rejected"
                );
                rejection.fail();
                rejected += 1;
            }
        }

        latch.wait().await;
        let logs = log.drain().await?;

        tracing::debug!(jobs = total, rejected, entries = logs.len(), "Batch completed");
        Ok(Submission { count, logs })
    }
}
