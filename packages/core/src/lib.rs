//! Core domain types for the scrape dispatch system.
//!
//! This crate contains shared types used across all packages:
//! - Job and its closed set of job kinds
//! - Result log entries returned to synchronous submitters
//! - Queue lifecycle state and status snapshots
//! - Error taxonomy and environment configuration

pub mod config;
mod error;
mod job;
mod log;
mod queue;

pub use config::AppConfig;
pub use error::{ConfigError, JobError, QueueError};
pub use job::{Job, JobId, JobKind, NavPoint, NavSeries, PushNotification};
pub use log::{LogEntry, PushStatus, entries_for, hide_target};
pub use queue::{AppStatus, QueueState};
