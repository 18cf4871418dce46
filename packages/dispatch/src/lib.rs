//! In-process job dispatch.
//!
//! # Architecture
//!
//! - `Worker` - bounded admission buffer plus the run function applied to each job
//! - `Queue` - owns one worker and a fixed pool of executor tasks
//! - `Coordinator` - submits batches, optionally blocking until every job reports back
//! - `BatchProcessor` - fixed fan-out helper for bulk-ingestion jobs
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use dispatch::{Coordinator, Queue, SimpleWorker};
//!
//! let queue = Arc::new(Queue::new(SimpleWorker::with_capacity(64), 4)?);
//! queue.start()?;
//!
//! let coordinator = Coordinator::new(queue.clone());
//! let submission = coordinator.submit(jobs, true).await?;
//!
//! queue.shutdown();
//! queue.wait().await;
//! ```

mod batch;
mod collector;
mod coordinator;
mod dispatcher;
mod latch;
mod queue;
mod runner;
mod worker;

pub use batch::{BatchProcessor, BatchReport};
pub use collector::{CollectorMessage, LogCollector, ResultLog};
pub use coordinator::{Coordinator, Submission, Tracker};
pub use dispatcher::{DEFAULT_FAN_OUT, Dispatcher};
pub use latch::Latch;
pub use queue::Queue;
pub use runner::{FnRunner, JobRunner, RunFuture};
pub use worker::{QueuedJob, Rejected, RunOutcome, SimpleWorker, Worker};

/// Re-export core types for convenience.
pub use scrape_core::{Job, JobError, LogEntry, QueueError, QueueState};
pub use tokio_util::sync::CancellationToken;
