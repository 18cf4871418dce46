//! Status and metrics endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use dispatch::Worker;
use scrape_core::{AppConfig, AppStatus};

use crate::metrics::record_snapshot;
use crate::state::AppState;
use crate::stats::SysStats;

/// GET /api/stat/app - Queue capacity, usage and total count.
pub async fn app_status<W: Worker>(State(state): State<Arc<AppState<W>>>) -> Json<AppStatus> {
    Json(state.status())
}

/// GET /api/config - The running configuration.
pub async fn config<W: Worker>(State(state): State<Arc<AppState<W>>>) -> Json<AppConfig> {
    Json(state.config.clone())
}

/// GET /sys/stats - Request counts and response times since startup.
pub async fn sys_stats<W: Worker>(State(state): State<Arc<AppState<W>>>) -> Json<SysStats> {
    Json(state.requests.snapshot())
}

/// GET /metrics - Prometheus text format.
///
/// Returns 503 Service Unavailable if no recorder is installed.
pub async fn metrics<W: Worker>(State(state): State<Arc<AppState<W>>>) -> Response {
    let Some(handle) = &state.metrics else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response();
    };

    let status = state.status();
    record_snapshot(status.queue_max, status.queue_usage, status.total_count);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
        .into_response()
}
