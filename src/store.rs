//! Table DDL and pool setup. Tables are created idempotently; there are no versioned migrations.

use crate::config::Settings;
use crate::error::{AppError, ConfigError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub const PERSONS_TABLE: &str = "persons";
pub const SECONDARY_CONTACTS_TABLE: &str = "secondary_contacts";
pub const EDUCATION_RECORDS_TABLE: &str = "education_records";

/// DDL in dependency order: parents before children.
/// Emails compare case-insensitively so uniqueness is not defeated by casing.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS persons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        birth_date DATE,
        address TEXT,
        high_school TEXT,
        primary_email TEXT NOT NULL COLLATE NOCASE UNIQUE,
        remark1 TEXT,
        remark2 TEXT,
        remark3 TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_persons_full_name ON persons (full_name)",
    r#"
    CREATE TABLE IF NOT EXISTS secondary_contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons (id) ON DELETE CASCADE,
        email TEXT NOT NULL COLLATE NOCASE UNIQUE,
        description TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_secondary_contacts_person ON secondary_contacts (person_id)",
    r#"
    CREATE TABLE IF NOT EXISTS education_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons (id) ON DELETE CASCADE,
        institution_name TEXT NOT NULL,
        student_id TEXT,
        institution_type TEXT,
        degree TEXT,
        start_date DATE,
        end_date DATE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_education_records_person ON education_records (person_id)",
];

/// Create all tables and indexes if they do not exist yet.
pub async fn ensure_tables(pool: &SqlitePool) -> Result<(), AppError> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::debug!("schema ensured");
    Ok(())
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConfigError::Invalid {
            key: "DATABASE_URL",
            value: database_url.to_string(),
        })?
        .create_if_missing(true)
        .foreign_keys(true);
    Ok(opts)
}

/// Open the pool described by `settings` and ensure the schema exists.
pub async fn connect(settings: &Settings) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(connect_options(&settings.database_url)?)
        .await?;
    ensure_tables(&pool).await?;
    Ok(pool)
}

/// Private in-memory database with the schema applied. Every connection to `:memory:` is a
/// separate database, so the pool holds exactly one connection and never recycles it.
pub async fn connect_in_memory() -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options("sqlite::memory:")?)
        .await?;
    ensure_tables(&pool).await?;
    Ok(pool)
}
