//! Application state for the Axum server.

use std::sync::Arc;

use dispatch::{Coordinator, Queue, Worker};
use metrics_exporter_prometheus::PrometheusHandle;
use scrape_core::{AppConfig, AppStatus};
use storage::StatStorage;

use crate::stats::RequestStats;

/// Shared application state accessible from all route handlers.
pub struct AppState<W: Worker> {
    pub config: AppConfig,
    /// Submission entry point over the running queue.
    pub coordinator: Coordinator<W>,
    pub stats: Arc<StatStorage>,
    /// `None` when no recorder is installed; `/metrics` then answers 503.
    pub metrics: Option<PrometheusHandle>,
    pub requests: RequestStats,
    pub version: String,
}

impl<W: Worker> AppState<W> {
    pub fn new(config: AppConfig, coordinator: Coordinator<W>, stats: Arc<StatStorage>) -> Self {
        Self {
            config,
            coordinator,
            stats,
            metrics: None,
            requests: RequestStats::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn queue(&self) -> &Arc<Queue<W>> {
        self.coordinator.queue()
    }

    pub fn status(&self) -> AppStatus {
        let queue = self.queue();
        AppStatus {
            version: self.version.clone(),
            queue_max: queue.capacity(),
            queue_usage: queue.usage(),
            total_count: self.stats.total_count(),
        }
    }
}
