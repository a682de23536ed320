//! Index database schema (idempotent).
//!
//! | Table | Contents |
//! |-------|----------|
//! | `contacts` | One row per contact; `seq` is the natural order |
//! | `contact_emails` | Every email of a contact (text-matching field) |
//!
//! Text-matching fields are stored twice: as given, and case-folded
//! (`*_folded`) with the core's `text::fold`. Searches compare folded
//! values only, since SQLite's own case folding covers ASCII alone.
//! | `visits` | Interactions, with optional location |

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes on an existing pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            contact_id TEXT NOT NULL UNIQUE,
            identification_level TEXT,
            first_name TEXT,
            middle_name TEXT,
            surname TEXT,
            preferred_email TEXT,
            job_title TEXT,
            value INTEGER NOT NULL DEFAULT 0,
            visit_count INTEGER NOT NULL DEFAULT 0,
            full_name TEXT,
            full_name_folded TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_emails (
            contact_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            email TEXT NOT NULL,
            email_folded TEXT NOT NULL,
            PRIMARY KEY (contact_id, position),
            FOREIGN KEY (contact_id) REFERENCES contacts(contact_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visits (
            interaction_id TEXT PRIMARY KEY,
            contact_id TEXT NOT NULL,
            start_date_time INTEGER NOT NULL,
            end_date_time INTEGER NOT NULL,
            visit_page_count INTEGER NOT NULL DEFAULT 0,
            value INTEGER NOT NULL DEFAULT 0,
            location_id TEXT,
            city TEXT,
            region TEXT,
            country TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_visits_contact_start ON visits(contact_id, start_date_time DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contact_emails_folded ON contact_emails(email_folded)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contacts_full_name_folded ON contacts(full_name_folded)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
