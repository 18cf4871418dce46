//! Queue owning one worker and a fixed pool of executor tasks.

use std::sync::Arc;
use std::time::Duration;

use scrape_core::{QueueError, QueueState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::worker::{QueuedJob, Rejected, RunOutcome, Worker};

/// Dispatcher over a single `Worker`.
///
/// Lifecycle: `Created` -> `Running` (start) -> `Draining` (shutdown) ->
/// `Stopped` (wait). A stopped queue cannot be restarted.
pub struct Queue<W: Worker> {
    worker: Arc<W>,
    pool_size: usize,
    shutdown: CancellationToken,
    executors: TaskTracker,
    state: watch::Sender<QueueState>,
}

impl<W: Worker> Queue<W> {
    pub fn new(worker: W, pool_size: usize) -> Result<Self, QueueError> {
        if pool_size == 0 {
            return Err(QueueError::InvalidPoolSize(pool_size));
        }

        Ok(Self {
            worker: Arc::new(worker),
            pool_size,
            shutdown: CancellationToken::new(),
            executors: TaskTracker::new(),
            state: watch::Sender::new(QueueState::Created),
        })
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn capacity(&self) -> usize {
        self.worker.capacity()
    }

    pub fn usage(&self) -> usize {
        self.worker.usage()
    }

    pub fn supports_sync(&self) -> bool {
        self.worker.supports_sync()
    }

    pub fn state(&self) -> QueueState {
        *self.state.borrow()
    }

    /// Launch the executor pool.
    pub fn start(&self) -> Result<(), QueueError> {
        let mut current = QueueState::Created;
        let started = self.state.send_if_modified(|state| {
            current = *state;
            if *state == QueueState::Created {
                *state = QueueState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(QueueError::AlreadyStarted(current));
        }

        for executor in 0..self.pool_size {
            let worker = self.worker.clone();
            let shutdown = self.shutdown.clone();
            self.executors.spawn(async move {
                let mut executed = 0usize;
                while let RunOutcome::Ran = worker.run(&shutdown).await {
                    executed += 1;
                }
                tracing::debug!(executor, executed, "Executor exited");
            });
        }

        tracing::info!(
            pool_size = self.pool_size,
            capacity = self.capacity(),
            "Queue started"
        );
        Ok(())
    }

    /// Admit one job. A rejected job is handed back to the caller.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), Rejected> {
        self.worker.queue(job)
    }

    /// Stop admission and let executors exit once the buffer is drained.
    /// In-flight jobs are never interrupted.
    pub fn shutdown(&self) {
        self.worker.close();
        self.shutdown.cancel();
        self.executors.close();

        let draining = self.state.send_if_modified(|state| {
            if state.is_accepting_jobs() {
                *state = QueueState::Draining;
                true
            } else {
                false
            }
        });
        if draining {
            tracing::info!(usage = self.usage(), "Queue shutting down");
        }
    }

    /// Wait until every executor has exited. Only returns after `shutdown`.
    pub async fn wait(&self) {
        self.executors.wait().await;

        let stopped = self.state.send_if_modified(|state| {
            if *state == QueueState::Draining {
                *state = QueueState::Stopped;
                true
            } else {
                false
            }
        });
        if stopped {
            tracing::info!("Queue stopped");
        }
    }

    /// `wait` bounded by `timeout`. Jobs still running keep running.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<(), QueueError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| QueueError::ShutdownTimeout(timeout))
    }
}

impl<W: Worker> Drop for Queue<W> {
    fn drop(&mut self) {
        self.worker.close();
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use scrape_core::{Job, PushNotification};

    use super::*;
    use crate::SimpleWorker;

    fn job() -> Job {
        Job::notification(PushNotification::new(vec!["token".into()], "hi"))
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = Queue::new(SimpleWorker::with_capacity(1), 0).err();
        assert_eq!(err, Some(QueueError::InvalidPoolSize(0)));
    }

    #[tokio::test]
    async fn lifecycle_moves_forward_only() {
        let queue = Queue::new(SimpleWorker::with_capacity(4), 2).unwrap();
        assert_eq!(queue.state(), QueueState::Created);

        queue.start().unwrap();
        assert_eq!(queue.state(), QueueState::Running);
        assert_eq!(
            queue.start(),
            Err(QueueError::AlreadyStarted(QueueState::Running))
        );

        queue.shutdown();
        assert_eq!(queue.state(), QueueState::Draining);

        queue.wait().await;
        assert_eq!(queue.state(), QueueState::Stopped);
        assert_eq!(
            queue.start(),
            Err(QueueError::AlreadyStarted(QueueState::Stopped))
        );
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_closed() {
        let queue = Queue::new(SimpleWorker::with_capacity(4), 1).unwrap();
        queue.start().unwrap();
        queue.shutdown();

        let rejected = queue.enqueue(job().into()).unwrap_err();
        assert_eq!(rejected.error, QueueError::Closed);
        queue.wait().await;
    }

    #[tokio::test]
    async fn wait_timeout_reports_slow_drain() {
        let worker = SimpleWorker::with_capacity(1).with_run_fn(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(())
            })
        });
        let queue = Queue::new(worker, 1).unwrap();
        queue.start().unwrap();
        queue.enqueue(job().into()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.shutdown();
        let timeout = Duration::from_millis(50);
        assert_eq!(
            queue.wait_timeout(timeout).await,
            Err(QueueError::ShutdownTimeout(timeout))
        );
        assert_eq!(queue.state(), QueueState::Draining);

        queue.wait_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(queue.state(), QueueState::Stopped);
    }
}
