//! Job domain types for work items handed to the dispatch queue.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single outbound notification addressed to one or more device tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    /// Caller supplied notification id, echoed back in result logs.
    #[serde(rename = "notif_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub tokens: Vec<String>,
    #[serde(default)]
    pub platform: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority: String,
    /// Topic recipient. Counts as one extra target when present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl PushNotification {
    pub fn new(tokens: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            tokens,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the platform code.
    pub fn with_platform(mut self, platform: i32) -> Self {
        self.platform = platform;
        self
    }

    /// Set the topic recipient.
    pub fn with_topic(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }
}

/// One net asset value observation for a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// A batch of NAV observations for one fund, stored in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavSeries {
    pub fund_id: String,
    #[serde(default)]
    pub points: Vec<NavPoint>,
}

impl NavSeries {
    pub fn new(fund_id: impl Into<String>, points: Vec<NavPoint>) -> Self {
        Self {
            fund_id: fund_id.into(),
            points,
        }
    }
}

/// The closed set of work the queue knows how to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    Notification(PushNotification),
    NavSeries(NavSeries),
}

/// A job represents a unit of work to be executed by the queue system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    #[serde(flatten)]
    pub kind: JobKind,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: JobId::new(),
            kind,
        }
    }

    pub fn notification(notification: PushNotification) -> Self {
        Self::new(JobKind::Notification(notification))
    }

    pub fn nav_series(series: NavSeries) -> Self {
        Self::new(JobKind::NavSeries(series))
    }

    /// Short label for logs and metrics.
    pub fn kind_str(&self) -> &'static str {
        match &self.kind {
            JobKind::Notification(_) => "notification",
            JobKind::NavSeries(_) => "nav_series",
        }
    }

    /// Identifier reported in result logs: the caller's id when given, else the job id.
    pub fn log_id(&self) -> String {
        match &self.kind {
            JobKind::Notification(n) if !n.id.is_empty() => n.id.clone(),
            _ => self.id.to_string(),
        }
    }

    /// Number of sub-targets this job accounts for in submission counts.
    pub fn sub_target_count(&self) -> usize {
        match &self.kind {
            JobKind::Notification(n) => n.tokens.len() + usize::from(!n.to.is_empty()),
            JobKind::NavSeries(_) => 1,
        }
    }

    /// Targets that receive one result log entry each.
    pub fn targets(&self) -> Vec<&str> {
        match &self.kind {
            JobKind::Notification(n) => n.tokens.iter().map(String::as_str).collect(),
            JobKind::NavSeries(s) => vec![s.fund_id.as_str()],
        }
    }

    /// Platform code carried into result logs.
    pub fn platform(&self) -> i32 {
        match &self.kind {
            JobKind::Notification(n) => n.platform,
            JobKind::NavSeries(_) => 0,
        }
    }

    /// Message carried into result logs.
    pub fn message(&self) -> String {
        match &self.kind {
            JobKind::Notification(n) => n.message.clone(),
            JobKind::NavSeries(s) => format!("{} nav points", s.points.len()),
        }
    }

    /// JSON byte form of the job, for logging and transport.
    pub fn bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<PushNotification> for Job {
    fn from(notification: PushNotification) -> Self {
        Self::notification(notification)
    }
}

impl From<NavSeries> for Job {
    fn from(series: NavSeries) -> Self {
        Self::nav_series(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("token-{i}")).collect()
    }

    #[test]
    fn notification_counts_tokens_and_topic() {
        let job = Job::notification(PushNotification::new(tokens(3), "hi"));
        assert_eq!(job.sub_target_count(), 3);
        assert_eq!(job.targets(), vec!["token-0", "token-1", "token-2"]);

        let job =
            Job::notification(PushNotification::new(tokens(2), "hi").with_topic("/topics/news"));
        assert_eq!(job.sub_target_count(), 3);
        assert_eq!(job.targets().len(), 2);
    }

    #[test]
    fn nav_series_is_a_single_target() {
        let series = NavSeries::new(
            "fund-4",
            vec![NavPoint {
                date: NaiveDate::from_ymd_opt(2021, 7, 16).unwrap(),
                nav: 1234.5,
            }],
        );
        let job = Job::nav_series(series);
        assert_eq!(job.sub_target_count(), 1);
        assert_eq!(job.targets(), vec!["fund-4"]);
        assert_eq!(job.message(), "1 nav points");
    }

    #[test]
    fn log_id_prefers_caller_id() {
        let mut notification = PushNotification::new(tokens(1), "hi");
        let job = Job::notification(notification.clone());
        assert_eq!(job.log_id(), job.id.to_string());

        notification.id = "abc".into();
        let job = Job::notification(notification);
        assert_eq!(job.log_id(), "abc");
    }

    #[test]
    fn bytes_are_tagged_json() {
        let job = Job::notification(PushNotification::new(tokens(1), "hello").with_platform(2));
        let value: serde_json::Value = serde_json::from_slice(&job.bytes().unwrap()).unwrap();
        assert_eq!(value["kind"], "notification");
        assert_eq!(value["message"], "hello");
        assert_eq!(value["platform"], 2);
        assert!(value.get("to").is_none());
    }

    #[test]
    fn notification_deserializes_with_defaults() {
        let n: PushNotification =
            serde_json::from_str(r#"{"tokens":["a","b"],"platform":1,"notif_id":"n-1"}"#).unwrap();
        assert_eq!(n.id, "n-1");
        assert_eq!(n.tokens.len(), 2);
        assert!(n.message.is_empty());
        assert!(n.data.is_empty());
    }
}
