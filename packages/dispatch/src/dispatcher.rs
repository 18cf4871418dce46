//! Built-in run function.

use std::sync::Arc;

use db::NavRepository;
use scrape_core::{Job, JobError, JobKind, NavSeries, PushNotification, hide_target};

use crate::batch::BatchProcessor;
use crate::runner::{JobRunner, RunFuture};

/// Fan-out used for bulk NAV ingestion when none is configured.
pub const DEFAULT_FAN_OUT: usize = 4;

/// Default run function, dispatching on the job kind.
#[derive(Clone)]
pub struct Dispatcher {
    nav: Option<NavRepository>,
    batch: BatchProcessor,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            nav: None,
            batch: BatchProcessor::new(DEFAULT_FAN_OUT),
        }
    }

    /// Store NAV series through `repo`.
    pub fn with_nav_repository(mut self, repo: NavRepository) -> Self {
        self.nav = Some(repo);
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.batch = BatchProcessor::new(fan_out);
        self
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner for Dispatcher {
    fn run(&self, job: &Job) -> RunFuture {
        match &job.kind {
            JobKind::Notification(notification) => {
                let result = push(notification);
                Box::pin(async move { result })
            }
            JobKind::NavSeries(series) => {
                let nav = self.nav.clone();
                let batch = self.batch;
                let series = series.clone();
                Box::pin(async move { store_series(nav, batch, series).await })
            }
        }
    }
}

/// Delivery itself belongs to the platform clients; this only validates
/// targets and records the attempt.
fn push(notification: &PushNotification) -> Result<(), JobError> {
    if notification.tokens.iter().any(String::is_empty) {
        return Err(JobError::failed("the token must not be empty"));
    }

    for token in &notification.tokens {
        tracing::debug!(
            platform = notification.platform,
            token = %hide_target(token),
            "Push notification"
        );
    }
    if !notification.to.is_empty() {
        tracing::debug!(
            platform = notification.platform,
            topic = %notification.to,
            "Push topic notification"
        );
    }
    Ok(())
}

async fn store_series(
    nav: Option<NavRepository>,
    batch: BatchProcessor,
    series: NavSeries,
) -> Result<(), JobError> {
    let Some(repo) = nav else {
        return Err(JobError::Storage("no nav repository configured".into()));
    };
    if series.points.is_empty() {
        return Ok(());
    }

    let fund_id: Arc<str> = series.fund_id.as_str().into();
    let report = {
        let fund_id = fund_id.clone();
        batch
            .process(series.points, move |point| {
                let repo = repo.clone();
                let fund_id = fund_id.clone();
                async move { repo.upsert(&fund_id, &point).await.map(|_| ()) }
            })
            .await
    };

    tracing::info!(
        fund_id = %fund_id,
        stored = report.succeeded,
        failed = report.failed,
        "Stored nav series"
    );

    if report.succeeded == 0 {
        return Err(JobError::Storage(format!(
            "no nav points stored for {fund_id} ({} failed)",
            report.failed
        )));
    }
    Ok(())
}
