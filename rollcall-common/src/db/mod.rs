//! Database access shared across the rollcall crates

pub mod models;

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the database connection pool
///
/// Opens (or creates) the SQLite file and ensures the schema exists.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_schema(&pool).await?;

    Ok(pool)
}

/// Create the vote-ingestion tables if they don't exist
///
/// The `legislators` table is populated by the separate roster loader;
/// this engine only reads it. It is still created here so a fresh
/// database is usable by that loader and by tests.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS legislators (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bioguide_id TEXT UNIQUE NOT NULL,
            lis_id TEXT,
            icpsr_id TEXT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            full_name TEXT NOT NULL,
            state TEXT,
            party TEXT,
            chamber TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vote_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vote_id TEXT UNIQUE NOT NULL,
            chamber TEXT NOT NULL,
            congress INTEGER NOT NULL,
            session INTEGER NOT NULL,
            roll INTEGER NOT NULL,
            vote_date TEXT NOT NULL,
            question TEXT NOT NULL,
            description TEXT,
            result TEXT NOT NULL,
            bill_number TEXT,
            tally_yea INTEGER NOT NULL DEFAULT 0,
            tally_nay INTEGER NOT NULL DEFAULT 0,
            tally_present INTEGER NOT NULL DEFAULT 0,
            tally_not_voting INTEGER NOT NULL DEFAULT 0,
            is_key_vote INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS member_votes (
            vote_session_id INTEGER NOT NULL REFERENCES vote_sessions(id),
            legislator_id INTEGER NOT NULL REFERENCES legislators(id),
            vote_cast TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (vote_session_id, legislator_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vote_sessions_chamber
         ON vote_sessions(chamber, congress, session)",
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database schema initialized (legislators, vote_sessions, member_votes)");

    Ok(())
}
