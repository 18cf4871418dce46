//! Fixed fan-out processing for bulk-ingestion jobs.

use std::fmt::Display;
use std::future::Future;

use tokio::task::JoinSet;

/// Outcome counts of one `BatchProcessor::process` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    fn merge(&mut self, other: BatchReport) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Splits items into at most `fan_out` contiguous chunks and processes the
/// chunks concurrently. Items inside a chunk run one after another.
///
/// A failing item is logged and skipped; it never aborts its chunk.
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    fan_out: usize,
}

impl BatchProcessor {
    /// A zero fan-out is treated as 1.
    pub fn new(fan_out: usize) -> Self {
        Self {
            fan_out: fan_out.max(1),
        }
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Process every item and return once the slowest chunk finishes.
    pub async fn process<T, F, Fut, E>(&self, items: Vec<T>, f: F) -> BatchReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut report = BatchReport::default();
        if items.is_empty() {
            return report;
        }

        let chunk_size = items.len().div_ceil(self.fan_out);
        let mut tasks = JoinSet::new();
        let mut items = items.into_iter();

        for chunk_index in 0usize.. {
            let chunk: Vec<T> = items.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            let f = f.clone();
            tasks.spawn(async move {
                let mut chunk_report = BatchReport::default();
                for item in chunk {
                    match f(item).await {
                        Ok(()) => chunk_report.succeeded += 1,
                        Err(e) => {
                            chunk_report.failed += 1;
                            tracing::warn!(chunk = chunk_index, error = %e, "Batch item failed");
                        }
                    }
                }
                chunk_report
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(chunk_report) => report.merge(chunk_report),
                Err(e) => tracing::error!(error = %e, "Batch chunk task failed"),
            }
        }

        tracing::debug!(
            fan_out = self.fan_out,
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch processed"
        );
        report
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(crate::DEFAULT_FAN_OUT)
    }
}
