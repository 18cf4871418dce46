//! API route definitions.

mod push;
mod stat;
mod system;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use dispatch::Worker;

use crate::state::AppState;
use crate::stats::track_requests;

pub use push::{NavRequest, PushRequest, PushResponse};

/// Build the complete router, mounting routes at the configured paths.
pub fn router<W: Worker>(state: Arc<AppState<W>>) -> Router {
    let api = &state.config.api;

    Router::new()
        .route("/", get(system::root))
        .route("/version", get(system::version::<W>))
        .route(&api.health_uri, get(system::heartbeat))
        .route(&api.metric_uri, get(stat::metrics::<W>))
        .route(&api.push_uri, post(push::push::<W>))
        .route(&api.nav_uri, post(push::nav::<W>))
        .route(&api.stat_app_uri, get(stat::app_status::<W>))
        .route(&api.config_uri, get(stat::config::<W>))
        .route(&api.sys_stat_uri, get(stat::sys_stats::<W>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests::<W>,
        ))
        .with_state(state)
}
