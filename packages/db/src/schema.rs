//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(NAV_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// NAV observation table. One record per fund and date.
const NAV_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS nav SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS fund_id ON nav TYPE string;
DEFINE FIELD IF NOT EXISTS date ON nav TYPE string;
DEFINE FIELD IF NOT EXISTS nav ON nav TYPE number;
DEFINE FIELD IF NOT EXISTS stored_at ON nav TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS nav_fund ON nav FIELDS fund_id;
DEFINE INDEX IF NOT EXISTS nav_fund_date ON nav FIELDS fund_id, date UNIQUE;
"#;
