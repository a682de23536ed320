//! SQLite database connection management.
//!
//! Provides a connection pool to the SQLite file backing the configured
//! search index, with WAL mode enabled so searches can run while the index
//! is being written. The database file and its parent directories are
//! created automatically if they don't exist.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::{Config, IndexConfig};

/// Create a connection pool to the configured search index database.
///
/// # Errors
///
/// Returns an error if the search index is not configured, or if the
/// database cannot be created or connected to.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_index(config.search_index()?).await
}

/// Create a connection pool for a specific index entry.
pub async fn connect_index(index: &IndexConfig) -> Result<SqlitePool> {
    let db_path = &index.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(index.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database {}", db_path.display()))?;

    Ok(pool)
}
