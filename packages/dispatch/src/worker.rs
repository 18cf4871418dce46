//! Worker contract and the in-memory bounded worker.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use futures_util::FutureExt;
use scrape_core::config::default_queue_num;
use scrape_core::{Job, JobError, QueueError};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::coordinator::Tracker;
use crate::dispatcher::Dispatcher;
use crate::runner::{FnRunner, JobRunner, RunFuture};

/// A job on its way through a worker, optionally tracked by a synchronous batch.
///
/// A tracked job that is dropped without being finished reports a failure
/// so its batch never waits on it forever.
#[derive(Debug)]
pub struct QueuedJob {
    job: Job,
    tracker: Option<Tracker>,
}

impl QueuedJob {
    pub fn new(job: Job) -> Self {
        Self { job, tracker: None }
    }

    pub fn tracked(job: Job, tracker: Tracker) -> Self {
        Self {
            job,
            tracker: Some(tracker),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn is_tracked(&self) -> bool {
        self.tracker.is_some()
    }

    /// Report the outcome to the tracking batch, if any.
    pub fn finish(mut self, error: Option<&str>) {
        if let Some(tracker) = self.tracker.take() {
            tracker.finish(&self.job, error);
        }
    }
}

impl Drop for QueuedJob {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracing::warn!(job_id = %self.job.id, "Tracked job dropped before execution");
            tracker.finish(&self.job, Some("job dropped before execution"));
        }
    }
}

impl From<Job> for QueuedJob {
    fn from(job: Job) -> Self {
        Self::new(job)
    }
}

/// A job turned away at admission, handed back with the reason.
#[derive(Debug)]
pub struct Rejected {
    pub job: QueuedJob,
    pub error: QueueError,
}

impl Rejected {
    pub fn new(job: QueuedJob, error: QueueError) -> Self {
        Self { job, error }
    }

    /// Record the rejection against the job and return the error.
    pub fn fail(self) -> QueueError {
        let message = self.error.to_string();
        self.job.finish(Some(&message));
        self.error
    }
}

/// What one `Worker::run` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// One job was executed.
    Ran,
    /// The worker is closed or cancelled and its buffer is empty.
    Drained,
}

/// Bounded execution surface that buffers and runs jobs.
///
/// Implementations other than `SimpleWorker` (for example one backed by an
/// external broker) plug into `Queue` and `Coordinator` unchanged.
pub trait Worker: Send + Sync + 'static {
    /// Fixed maximum number of resident jobs.
    fn capacity(&self) -> usize;

    /// Jobs currently queued or executing.
    fn usage(&self) -> usize;

    /// Admit one job without blocking, or hand it back.
    fn queue(&self, job: QueuedJob) -> Result<(), Rejected>;

    /// Execute the next job. Returns `Drained` once `shutdown` is cancelled
    /// (or the worker closed) and nothing is left to run.
    fn run(&self, shutdown: &CancellationToken) -> impl Future<Output = RunOutcome> + Send;

    /// Stop admitting jobs. Already buffered jobs still run.
    fn close(&self) {}

    /// Whether completion can be reported back to a synchronous submitter.
    fn supports_sync(&self) -> bool {
        true
    }
}

/// In-memory worker over a bounded channel.
pub struct SimpleWorker {
    capacity: usize,
    usage: AtomicUsize,
    sender: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    receiver: Mutex<mpsc::Receiver<QueuedJob>>,
    runner: Arc<dyn JobRunner>,
}

impl SimpleWorker {
    /// Worker with the default capacity (twice the available CPUs).
    pub fn new() -> Self {
        Self::with_capacity(default_queue_num())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            capacity,
            usage: AtomicUsize::new(0),
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(receiver),
            runner: Arc::new(Dispatcher::new()),
        }
    }

    /// Replace the run function.
    pub fn with_runner(mut self, runner: impl JobRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn with_run_fn<F>(self, run: F) -> Self
    where
        F: Fn(&Job) -> RunFuture + Send + Sync + 'static,
    {
        self.with_runner(FnRunner::new(run))
    }

    fn reserve_slot(&self) -> bool {
        self.usage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |usage| {
                (usage < self.capacity).then_some(usage + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        self.usage.fetch_sub(1, Ordering::AcqRel);
    }

    async fn execute(&self, queued: QueuedJob) {
        let job = queued.job();
        let started = Instant::now();

        let outcome = AssertUnwindSafe(async { self.runner.run(job).await })
            .catch_unwind()
            .await;
        let result = outcome.unwrap_or(Err(JobError::Panicked));

        self.release_slot();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => tracing::debug!(
                job_id = %job.id,
                kind = job.kind_str(),
                elapsed_ms,
                "Job completed"
            ),
            Err(e) => tracing::warn!(
                job_id = %job.id,
                kind = job.kind_str(),
                elapsed_ms,
                error = %e,
                "Job failed"
            ),
        }

        let error = result.err().map(|e| e.to_string());
        queued.finish(error.as_deref());
    }
}

impl Default for SimpleWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for SimpleWorker {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn usage(&self) -> usize {
        self.usage.load(Ordering::Acquire)
    }

    fn queue(&self, job: QueuedJob) -> Result<(), Rejected> {
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(Rejected::new(job, QueueError::Closed));
        };

        if !self.reserve_slot() {
            return Err(Rejected::new(job, QueueError::MaxCapacity));
        }

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.release_slot();
                Err(Rejected::new(job, QueueError::MaxCapacity))
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.release_slot();
                Err(Rejected::new(job, QueueError::Closed))
            }
        }
    }

    async fn run(&self, shutdown: &CancellationToken) -> RunOutcome {
        let next = {
            let mut receiver = self.receiver.lock().await;
            tokio::select! {
                biased;
                job = receiver.recv() => job,
                _ = shutdown.cancelled() => receiver.try_recv().ok(),
            }
        };

        match next {
            Some(queued) => {
                self.execute(queued).await;
                RunOutcome::Ran
            }
            None => RunOutcome::Drained,
        }
    }

    fn close(&self) {
        let mut sender = self.sender.write().unwrap_or_else(PoisonError::into_inner);
        if sender.take().is_some() {
            tracing::debug!(usage = self.usage(), "Worker closed for admission");
        }
    }
}
