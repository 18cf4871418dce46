//! HTTP surface of the dispatch server.
//!
//! - `POST /api/push` and `POST /api/nav` submit batches through the `Coordinator`
//! - `GET /api/stat/app` and `GET /metrics` expose queue usage and totals
//! - `GET /api/config` and `GET /sys/stats` expose the running config and request stats
//!
//! Every path except `/` and `/version` is taken from `AppConfig::api`.
//! - `/`, `/healthz` and `/version` for operators

mod error;
pub mod metrics;
mod routes;
mod state;
mod stats;

pub use error::{ApiError, ErrorResponse};
pub use routes::{NavRequest, PushRequest, PushResponse, router};
pub use state::AppState;
pub use stats::{RequestStats, SysStats};
