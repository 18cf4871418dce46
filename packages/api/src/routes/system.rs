use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use dispatch::Worker;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "text": "Welcome to scrape dispatch server." }))
}

/// GET|HEAD /healthz
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

pub async fn version<W: Worker>(State(state): State<Arc<AppState<W>>>) -> Json<Value> {
    Json(json!({
        "source": "scrape-dispatch",
        "version": state.version,
    }))
}
