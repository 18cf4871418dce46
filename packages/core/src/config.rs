//! Application configuration read from `SCRAPE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::ConfigError;

const PREFIX: &str = "SCRAPE_";

/// Queue engine backing the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueEngine {
    /// In-process bounded buffer.
    #[default]
    Local,
}

impl QueueEngine {
    /// Whether submitters can block until jobs finish.
    pub fn supports_sync(self) -> bool {
        matches!(self, QueueEngine::Local)
    }
}

/// Backend for the processed-count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatEngine {
    #[default]
    Memory,
    Filesystem,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreConfig {
    pub address: String,
    pub port: u16,
    /// Number of concurrent executors.
    pub worker_num: usize,
    /// Worker buffer capacity.
    pub queue_num: usize,
    /// Block submitters until their batch finishes.
    pub sync: bool,
    /// Maximum jobs accepted in one request.
    pub max_notification: usize,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatConfig {
    pub engine: StatEngine,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    pub format: LogFormat,
    pub hide_token: bool,
}

/// Mount points of the HTTP routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiConfig {
    pub push_uri: String,
    pub nav_uri: String,
    pub stat_app_uri: String,
    pub config_uri: String,
    pub sys_stat_uri: String,
    pub metric_uri: String,
    pub health_uri: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            push_uri: "/api/push".to_string(),
            nav_uri: "/api/nav".to_string(),
            stat_app_uri: "/api/stat/app".to_string(),
            config_uri: "/api/config".to_string(),
            sys_stat_uri: "/sys/stats".to_string(),
            metric_uri: "/metrics".to_string(),
            health_uri: "/healthz".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub api: ApiConfig,
    pub queue_engine: QueueEngine,
    pub stat: StatConfig,
    pub db_endpoint: String,
    /// Fan-out used by bulk NAV inserts.
    pub batch_workers: usize,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                address: "0.0.0.0".to_string(),
                port: 8088,
                worker_num: default_worker_num(),
                queue_num: default_queue_num(),
                sync: false,
                max_notification: 100,
                shutdown_timeout: Duration::from_secs(30),
            },
            api: ApiConfig::default(),
            queue_engine: QueueEngine::Local,
            stat: StatConfig {
                engine: StatEngine::Memory,
                path: PathBuf::from("./data/stat"),
            },
            db_endpoint: "mem://".to_string(),
            batch_workers: 4,
            log: LogConfig {
                format: LogFormat::Text,
                hide_token: true,
            },
        }
    }
}

/// One executor per available CPU.
pub fn default_worker_num() -> usize {
    num_cpus::get().max(1)
}

/// Twice the number of available CPUs.
pub fn default_queue_num() -> usize {
    default_worker_num() << 1
}

impl AppConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Keys are the full variable names, e.g. `SCRAPE_PORT`. Unset or blank
    /// values fall back to defaults; zero pool sizes and capacities do too.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let mut cfg = Self::default();

        if let Some(address) = env.string("ADDRESS") {
            cfg.core.address = address;
        }
        if let Some(port) = env.number("PORT")? {
            cfg.core.port = port;
        }
        if let Some(n) = env.number::<usize>("WORKER_NUM")?.filter(|n| *n > 0) {
            cfg.core.worker_num = n;
        }
        if let Some(n) = env.number::<usize>("QUEUE_NUM")?.filter(|n| *n > 0) {
            cfg.core.queue_num = n;
        }
        if let Some(sync) = env.boolean("SYNC")? {
            cfg.core.sync = sync;
        }
        if let Some(max) = env.number("MAX_NOTIFICATION")? {
            cfg.core.max_notification = max;
        }
        if let Some(secs) = env.number("SHUTDOWN_TIMEOUT")? {
            cfg.core.shutdown_timeout = Duration::from_secs(secs);
        }

        for (name, uri) in [
            ("API_PUSH_URI", &mut cfg.api.push_uri),
            ("API_NAV_URI", &mut cfg.api.nav_uri),
            ("API_STAT_APP_URI", &mut cfg.api.stat_app_uri),
            ("API_CONFIG_URI", &mut cfg.api.config_uri),
            ("API_SYS_STAT_URI", &mut cfg.api.sys_stat_uri),
            ("API_METRIC_URI", &mut cfg.api.metric_uri),
            ("API_HEALTH_URI", &mut cfg.api.health_uri),
        ] {
            if let Some(value) = env.string(name) {
                if !value.starts_with('/') {
                    return Err(env.unsupported(name, &value, "a path starting with '/'"));
                }
                *uri = value;
            }
        }

        cfg.queue_engine = match env.string("QUEUE_ENGINE").as_deref() {
            None | Some("local") => QueueEngine::Local,
            Some(other) => return Err(env.unsupported("QUEUE_ENGINE", other, "local")),
        };

        cfg.stat.engine = match env.string("STAT_ENGINE").as_deref() {
            None | Some("memory") => StatEngine::Memory,
            Some("filesystem") | Some("fs") => StatEngine::Filesystem,
            Some(other) => {
                return Err(env.unsupported("STAT_ENGINE", other, "memory|filesystem"));
            }
        };
        if let Some(path) = env.string("STAT_PATH") {
            cfg.stat.path = PathBuf::from(path);
        }

        if let Some(endpoint) = env.string("DB_ENDPOINT") {
            cfg.db_endpoint = endpoint;
        }
        if let Some(n) = env.number::<usize>("BATCH_WORKERS")?.filter(|n| *n > 0) {
            cfg.batch_workers = n;
        }

        cfg.log.format = match env.string("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(env.unsupported("LOG_FORMAT", other, "text|json")),
        };
        if let Some(hide) = env.boolean("HIDE_TOKEN")? {
            cfg.log.hide_token = hide;
        }

        Ok(cfg)
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.core.address, self.core.port)
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(&format!("{PREFIX}{name}")).and_then(non_empty)
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        match self.string(name) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: format!("{PREFIX}{name}"),
                    value,
                }),
        }
    }

    fn boolean(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.string(name) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Ok(Some(true)),
            "0" | "false" | "no" | "n" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidBool {
                key: format!("{PREFIX}{name}"),
                value,
            }),
        }
    }

    fn unsupported(&self, name: &str, value: &str, expected: &'static str) -> ConfigError {
        ConfigError::Unsupported {
            key: format!("{PREFIX}{name}"),
            value: value.to_string(),
            expected,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_follow_cpu_count() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.core.worker_num, num_cpus::get().max(1));
        assert_eq!(cfg.core.queue_num, cfg.core.worker_num * 2);
        assert!(!cfg.core.sync);
        assert_eq!(cfg.queue_engine, QueueEngine::Local);
        assert_eq!(cfg.stat.engine, StatEngine::Memory);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8088");
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config_from(&[
            ("SCRAPE_PORT", "9000"),
            ("SCRAPE_WORKER_NUM", "3"),
            ("SCRAPE_QUEUE_NUM", "16"),
            ("SCRAPE_SYNC", "true"),
            ("SCRAPE_STAT_ENGINE", "fs"),
            ("SCRAPE_LOG_FORMAT", "json"),
            ("SCRAPE_HIDE_TOKEN", "no"),
            ("SCRAPE_SHUTDOWN_TIMEOUT", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.core.port, 9000);
        assert_eq!(cfg.core.worker_num, 3);
        assert_eq!(cfg.core.queue_num, 16);
        assert!(cfg.core.sync);
        assert_eq!(cfg.stat.engine, StatEngine::Filesystem);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert!(!cfg.log.hide_token);
        assert_eq!(cfg.core.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_sizes_fall_back_to_defaults() {
        let cfg = config_from(&[("SCRAPE_WORKER_NUM", "0"), ("SCRAPE_QUEUE_NUM", " ")]).unwrap();
        assert_eq!(cfg.core.worker_num, default_worker_num());
        assert_eq!(cfg.core.queue_num, default_queue_num());
    }

    #[test]
    fn api_paths_are_configurable() {
        let cfg = config_from(&[
            ("SCRAPE_API_PUSH_URI", "/v2/push"),
            ("SCRAPE_API_HEALTH_URI", "/ping"),
        ])
        .unwrap();
        assert_eq!(cfg.api.push_uri, "/v2/push");
        assert_eq!(cfg.api.health_uri, "/ping");
        assert_eq!(cfg.api.config_uri, "/api/config");

        assert!(matches!(
            config_from(&[("SCRAPE_API_METRIC_URI", "metrics")]),
            Err(ConfigError::Unsupported { .. })
        ));
    }

    #[test]
    fn config_serializes_with_lowercase_engines() {
        let value = serde_json::to_value(config_from(&[]).unwrap()).unwrap();
        assert_eq!(value["queue_engine"], "local");
        assert_eq!(value["stat"]["engine"], "memory");
        assert_eq!(value["api"]["sys_stat_uri"], "/sys/stats");
        assert_eq!(value["core"]["port"], 8088);
    }

    #[test]
    fn local_engine_supports_sync() {
        assert!(QueueEngine::Local.supports_sync());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("SCRAPE_PORT", "http")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            config_from(&[("SCRAPE_SYNC", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            config_from(&[("SCRAPE_QUEUE_ENGINE", "nsq")]),
            Err(ConfigError::Unsupported { .. })
        ));
    }
}
