//! NAV repository used by bulk-ingestion jobs.

use chrono::NaiveDate;
use scrape_core::NavPoint;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::{Database, DbError};

/// Repository for NAV persistence operations.
///
/// Writes are keyed by fund and date, so storing the same point twice
/// leaves a single record.
#[derive(Clone)]
pub struct NavRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
#[derive(Debug, Serialize, Deserialize)]
struct NavRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    fund_id: String,
    date: NaiveDate,
    nav: f64,
}

impl NavRecord {
    fn new(fund_id: &str, point: &NavPoint) -> Self {
        Self {
            id: None,
            fund_id: fund_id.to_string(),
            date: point.date,
            nav: point.nav,
        }
    }

    fn into_point(self) -> NavPoint {
        NavPoint {
            date: self.date,
            nav: self.nav,
        }
    }
}

impl NavRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn record_key(fund_id: &str, date: NaiveDate) -> String {
        format!("{fund_id}_{date}")
    }

    /// Insert or replace one observation.
    pub async fn upsert(&self, fund_id: &str, point: &NavPoint) -> Result<NavPoint, DbError> {
        if fund_id.is_empty() {
            return Err(DbError::Query("fund id must not be empty".into()));
        }
        if !point.nav.is_finite() {
            return Err(DbError::Query(format!(
                "nav for {fund_id} on {} is not a finite number",
                point.date
            )));
        }

        let record: Option<NavRecord> = self
            .db
            .upsert(("nav", Self::record_key(fund_id, point.date)))
            .content(NavRecord::new(fund_id, point))
            .await?;

        record
            .map(NavRecord::into_point)
            .ok_or_else(|| DbError::Query("Failed to store nav point".into()))
    }

    /// All observations for a fund, oldest first.
    pub async fn list(&self, fund_id: &str) -> Result<Vec<NavPoint>, DbError> {
        let mut response = self
            .db
            .query("SELECT * FROM nav WHERE fund_id = $fund_id ORDER BY date ASC")
            .bind(("fund_id", fund_id.to_string()))
            .await?;

        let records: Vec<NavRecord> = response.take(0)?;
        Ok(records.into_iter().map(NavRecord::into_point).collect())
    }

    /// Get a single observation.
    pub async fn get(&self, fund_id: &str, date: NaiveDate) -> Result<NavPoint, DbError> {
        let record: Option<NavRecord> = self
            .db
            .select(("nav", Self::record_key(fund_id, date)))
            .await?;

        record
            .map(NavRecord::into_point)
            .ok_or_else(|| DbError::NotFound(format!("nav {fund_id} on {date}")))
    }

    /// Number of stored observations for a fund.
    pub async fn count(&self, fund_id: &str) -> Result<usize, DbError> {
        let mut response = self
            .db
            .query("SELECT count() FROM nav WHERE fund_id = $fund_id GROUP ALL")
            .bind(("fund_id", fund_id.to_string()))
            .await?;

        #[derive(Deserialize)]
        struct CountResult {
            count: i64,
        }

        let counts: Vec<CountResult> = response.take(0)?;
        Ok(counts.first().map_or(0, |c| c.count.max(0) as usize))
    }

    /// Remove every observation for a fund.
    pub async fn delete_fund(&self, fund_id: &str) -> Result<(), DbError> {
        self.db
            .query("DELETE nav WHERE fund_id = $fund_id")
            .bind(("fund_id", fund_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
