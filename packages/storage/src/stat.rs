//! Processed-count statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use scrape_core::config::{StatConfig, StatEngine};
use serde::{Deserialize, Serialize};

use crate::{Storage, StorageConfig, StorageError};

/// Object key holding the persisted counters.
pub const TOTAL_COUNT_KEY: &str = "scrape-total-count.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StatApp {
    total_count: u64,
}

/// Total number of sub-targets accepted for dispatch.
///
/// The counter itself is always an atomic; an optional object store keeps
/// it across restarts (loaded on `init`, written on `flush`/`close`).
#[derive(Debug, Default)]
pub struct StatStorage {
    total_count: AtomicU64,
    backend: Option<Storage>,
}

impl StatStorage {
    /// Counter without persistence.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Counter persisted through an object store.
    pub fn persistent(storage: Storage) -> Self {
        Self {
            total_count: AtomicU64::new(0),
            backend: Some(storage),
        }
    }

    pub fn from_config(cfg: &StatConfig) -> Result<Self, StorageError> {
        match cfg.engine {
            StatEngine::Memory => Ok(Self::memory()),
            StatEngine::Filesystem => Ok(Self::persistent(Storage::new(
                StorageConfig::filesystem(&cfg.path),
            )?)),
        }
    }

    pub fn engine_str(&self) -> &'static str {
        match &self.backend {
            None => "memory",
            Some(storage) => storage.kind().as_str(),
        }
    }

    /// Load the persisted count, if any.
    pub async fn init(&self) -> Result<(), StorageError> {
        let Some(storage) = &self.backend else {
            return Ok(());
        };

        match storage.get_json::<StatApp>(TOTAL_COUNT_KEY).await {
            Ok(stat) => {
                self.total_count.store(stat.total_count, Ordering::Relaxed);
                tracing::info!(total_count = stat.total_count, "Loaded stat storage");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn reset(&self) {
        self.total_count.store(0, Ordering::Relaxed);
    }

    pub fn add_total_count(&self, count: u64) {
        self.total_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Persist the current count.
    pub async fn flush(&self) -> Result<(), StorageError> {
        if let Some(storage) = &self.backend {
            let stat = StatApp {
                total_count: self.total_count(),
            };
            storage.put_json(TOTAL_COUNT_KEY, &stat).await?;
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<(), StorageError> {
        self.flush().await
    }
}
