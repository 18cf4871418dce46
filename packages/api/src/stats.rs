//! Request statistics behind `GET /sys/stats`.
//!
//! Every request passes through [`track_requests`], which records its status
//! code and response time both here and in the Prometheus recorder.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dispatch::Worker;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Default)]
struct Counters {
    count: u64,
    response_time: Duration,
    status_codes: BTreeMap<u16, u64>,
}

/// Process-wide request counters.
#[derive(Debug)]
pub struct RequestStats {
    started: Instant,
    counters: Mutex<Counters>,
}

/// Snapshot served by `GET /sys/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysStats {
    pub pid: u32,
    pub uptime_sec: f64,
    pub unixtime: u64,
    pub total_count: u64,
    pub total_status_code_count: BTreeMap<String, u64>,
    pub total_response_time_sec: f64,
    pub average_response_time_sec: f64,
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record(&self, status: u16, elapsed: Duration) {
        let mut counters = self.lock();
        counters.count += 1;
        counters.response_time += elapsed;
        *counters.status_codes.entry(status).or_default() += 1;
    }

    pub fn snapshot(&self) -> SysStats {
        let counters = self.lock();
        let total = counters.response_time.as_secs_f64();
        let average = if counters.count == 0 {
            0.0
        } else {
            total / counters.count as f64
        };

        SysStats {
            pid: std::process::id(),
            uptime_sec: self.started.elapsed().as_secs_f64(),
            unixtime: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            total_count: counters.count,
            total_status_code_count: counters
                .status_codes
                .iter()
                .map(|(code, n)| (code.to_string(), *n))
                .collect(),
            total_response_time_sec: total,
            average_response_time_sec: average,
        }
    }

    // A panic while holding the lock leaves plain counters behind.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Middleware recording the outcome of every request.
pub async fn track_requests<W: Worker>(
    State(state): State<Arc<AppState<W>>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status();
    state.requests.record(status.as_u16(), elapsed);
    crate::metrics::record_request(status.as_str(), elapsed);
    response
}
