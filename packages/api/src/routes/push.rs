//! Batch submission endpoints.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use dispatch::Worker;
use scrape_core::{Job, LogEntry, NavSeries, PushNotification};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PushRequest {
    pub notifications: Vec<PushNotification>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NavRequest {
    pub series: Vec<NavSeries>,
}

/// `{"success": "ok", "counts": n, "logs": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct PushResponse {
    pub success: String,
    pub counts: usize,
    pub logs: Vec<LogEntry>,
}

/// POST /api/push - Submit a batch of notifications.
pub async fn push<W: Worker>(
    State(state): State<Arc<AppState<W>>>,
    payload: Result<Json<PushRequest>, JsonRejection>,
) -> Result<Json<PushResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Invalid push request");
        ApiError::bad_request("Missing notifications field.")
    })?;

    check_batch_size(
        &state,
        request.notifications.len(),
        "Notifications field is empty.",
        "Max notification count exceeded.",
    )?;

    let jobs = request.notifications.into_iter().map(Job::from).collect();
    submit(&state, jobs).await
}

/// POST /api/nav - Submit NAV series for bulk storage.
pub async fn nav<W: Worker>(
    State(state): State<Arc<AppState<W>>>,
    payload: Result<Json<NavRequest>, JsonRejection>,
) -> Result<Json<PushResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Invalid nav request");
        ApiError::bad_request("Missing series field.")
    })?;

    check_batch_size(
        &state,
        request.series.len(),
        "Series field is empty.",
        "Max series count exceeded.",
    )?;

    let jobs = request.series.into_iter().map(Job::from).collect();
    submit(&state, jobs).await
}

fn check_batch_size<W: Worker>(
    state: &AppState<W>,
    len: usize,
    empty: &str,
    too_many: &str,
) -> Result<(), ApiError> {
    if len == 0 {
        return Err(ApiError::bad_request(empty));
    }
    if len > state.config.core.max_notification {
        return Err(ApiError::bad_request(too_many));
    }
    Ok(())
}

async fn submit<W: Worker>(
    state: &AppState<W>,
    jobs: Vec<Job>,
) -> Result<Json<PushResponse>, ApiError> {
    let sync = state.config.core.sync && state.config.queue_engine.supports_sync();
    let submission = state.coordinator.submit(jobs, sync).await?;
    state.stats.add_total_count(submission.count as u64);

    Ok(Json(PushResponse {
        success: "ok".to_string(),
        counts: submission.count,
        logs: submission.logs,
    }))
}
