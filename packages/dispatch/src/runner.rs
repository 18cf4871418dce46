//! Run functions applied to dequeued jobs.

use std::future::Future;
use std::pin::Pin;

use scrape_core::{Job, JobError};

/// Future type for async run functions.
pub type RunFuture = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send>>;

/// Executable behaviour applied to each job a worker dequeues.
///
/// The returned future must own whatever it needs from the job.
pub trait JobRunner: Send + Sync + 'static {
    fn run(&self, job: &Job) -> RunFuture;
}

/// A simple function-based run function.
pub struct FnRunner<F>
where
    F: Fn(&Job) -> RunFuture + Send + Sync + 'static,
{
    run: F,
}

impl<F> FnRunner<F>
where
    F: Fn(&Job) -> RunFuture + Send + Sync + 'static,
{
    pub fn new(run: F) -> Self {
        Self { run }
    }
}

impl<F> JobRunner for FnRunner<F>
where
    F: Fn(&Job) -> RunFuture + Send + Sync + 'static,
{
    fn run(&self, job: &Job) -> RunFuture {
        (self.run)(job)
    }
}

/// Helper macro for creating run functions from async bodies.
///
/// The job is cloned into the future.
#[macro_export]
macro_rules! job_runner {
    (|$job:ident| $body:expr) => {
        $crate::FnRunner::new(|$job: &$crate::Job| -> $crate::RunFuture {
            let $job = $job.clone();
            Box::pin(async move { $body })
        })
    };
}
